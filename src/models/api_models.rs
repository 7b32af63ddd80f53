// Wire shapes - what the API sends and accepts

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::blog_models::{Category, PostStatus, Tag, UserSummary};
use crate::framework::validation::nullable;

/// Post summary used by list endpoints; leaves out the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostListView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub author: UserSummary,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub status: PostStatus,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub view_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Full post with body and the whole comment tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetailView {
    #[serde(flatten)]
    pub summary: PostListView,
    pub content: String,
    pub comments: Vec<CommentView>,
}

/// A comment with its replies nested recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub author: UserSummary,
    pub parent: Option<i64>,
    pub replies: Vec<CommentView>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: i64,
    pub user: UserSummary,
    pub bio: String,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub location: String,
    pub birth_date: Option<NaiveDate>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author-settable post fields. `author`, `slug` and `view_count` are
/// server-assigned and ignored if sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostWrite {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<i64>>,
    /// Present means "replace the whole tag set".
    pub tags: Option<Vec<i64>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub featured_image: Option<Option<String>>,
    pub is_featured: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub published_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryWrite {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagWrite {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Client-settable comment fields; `is_approved`, `author` and `post` are not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentWrite {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent: Option<Option<i64>>,
}

/// Client-settable profile fields; `is_verified` is not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileWrite {
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
}

/// Query parameters accepted by the post list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub is_featured: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// `search` / `ordering` for the simpler collections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ByCategoryParams {
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ByTagParams {
    pub tag_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentListParams {
    pub ordering: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_write_ignores_server_fields() {
        let payload: PostWrite = serde_json::from_str(
            r#"{"title": "Hi", "content": "Body", "author": 99, "view_count": 1000, "slug": "x"}"#,
        )
        .unwrap();
        assert_eq!(payload.title.as_deref(), Some("Hi"));
        assert!(payload.tags.is_none());
    }

    #[test]
    fn test_post_write_tags_absent_vs_empty() {
        let absent: PostWrite = serde_json::from_str(r#"{}"#).unwrap();
        let empty: PostWrite = serde_json::from_str(r#"{"tags": []}"#).unwrap();
        assert_eq!(absent.tags, None);
        assert_eq!(empty.tags, Some(vec![]));
    }
}
