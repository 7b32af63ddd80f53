// Blog data model - stored rows and API wire shapes

pub mod api_models;
pub mod blog_models;

pub use api_models::*;
pub use blog_models::*;
