// Framework layer - request plumbing shared by every resource

pub mod extract;     // JSON/query/path extractors with AppError rejections
pub mod listing;     // ordering and search parameters
pub mod privacy;     // permission rules and per-resource policies
pub mod slug;        // slug derivation for posts
pub mod validation;  // field-level validation errors
