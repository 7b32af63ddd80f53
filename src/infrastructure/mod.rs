// Core infrastructure modules
pub mod middleware;            // Authentication middleware and Vc extractor
pub mod viewer;                // Viewer context

pub use viewer::ViewerContext;
