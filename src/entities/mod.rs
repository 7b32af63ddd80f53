// Blog entities - each module adds its store operations to `BlogDatabase`

pub mod ent_category;
pub mod ent_comment;
pub mod ent_post;
pub mod ent_profile;
pub mod ent_tag;
pub mod ent_user;

pub use ent_category::CATEGORY_ORDERING;
pub use ent_comment::{COMMENT_ORDERING, MAX_REPLY_DEPTH};
pub use ent_post::{NewPost, PostChanges, PostFilter, POST_ORDERING};
pub use ent_profile::ProfileChanges;
pub use ent_tag::TAG_ORDERING;
