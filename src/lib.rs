// Blog API - posts, categories, tags, threaded comments and user profiles

// Configuration and shared state
pub mod app_state;
pub mod config;

// Storage - SQLite pool, schema, and per-entity store operations
pub mod database;
pub mod entities;
pub mod models;

// Request plumbing - identity, permissions, validation, listing
pub mod framework;
pub mod infrastructure;

// View assembly and HTTP handlers
pub mod api;
pub mod services;

// Common utilities
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use api::create_blog_router;
pub use error::{AppError, AppResult};
