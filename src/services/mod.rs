pub mod comment_tree;
pub mod post_viewer_service;

pub use post_viewer_service::PostViewerService;
