// Posts - filtered listing, slugged creation, tag-set replacement and the
// atomic view counter

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::{
    database::BlogDatabase,
    entities::ent_tag::replace_post_tags,
    error::{is_unique_violation, AppError, AppResult},
    framework::{
        listing::{push_search, OrderingFields},
        slug::{slug_candidate, slugify, MAX_SLUG_ATTEMPTS},
    },
    models::{BlogStats, PostRecord, PostStatus},
};

pub const POST_ORDERING: OrderingFields = OrderingFields::new(
    &["created_at", "updated_at", "published_at", "view_count"],
    &["-created_at"],
);

pub const POST_SEARCH_COLUMNS: &[&str] = &["p.title", "p.content", "p.excerpt"];

const POST_SELECT: &str = "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.author_id, \
     p.category_id, p.status, p.featured_image, p.is_featured, p.view_count, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND c.is_approved = 1) AS comments_count, \
     p.created_at, p.updated_at, p.published_at \
     FROM posts p";

/// Row-level narrowing applied to every post query.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Hide everything that is not published (anonymous callers).
    pub published_only: bool,
    pub status: Option<PostStatus>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub is_featured: Option<bool>,
    pub search: Vec<String>,
}

impl PostFilter {
    pub fn visible_to(is_authenticated: bool) -> Self {
        PostFilter {
            published_only: !is_authenticated,
            ..PostFilter::default()
        }
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if self.published_only {
            qb.push(" AND p.status = ");
            qb.push_bind(PostStatus::Published);
        }
        if let Some(status) = self.status {
            qb.push(" AND p.status = ");
            qb.push_bind(status);
        }
        if let Some(category_id) = self.category_id {
            qb.push(" AND p.category_id = ");
            qb.push_bind(category_id);
        }
        if let Some(tag_id) = self.tag_id {
            qb.push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ");
            qb.push_bind(tag_id);
            qb.push(")");
        }
        if let Some(is_featured) = self.is_featured {
            qb.push(" AND p.is_featured = ");
            qb.push_bind(is_featured);
        }
        push_search(qb, &self.search, POST_SEARCH_COLUMNS);
    }
}

/// A post about to be created. `slug: None` derives one from the title.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub status: PostStatus,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        NewPost {
            title: title.into(),
            slug: None,
            content: content.into(),
            excerpt: String::new(),
            category_id: None,
            tag_ids: Vec::new(),
            status: PostStatus::default(),
            featured_image: None,
            is_featured: false,
            published_at: None,
        }
    }
}

/// Field changes for an update. `None` leaves a field untouched; the nested
/// options clear nullable columns; `tag_ids: Some(..)` replaces the whole set.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category_id: Option<Option<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<Option<String>>,
    pub is_featured: Option<bool>,
    pub published_at: Option<Option<DateTime<Utc>>>,
}

impl BlogDatabase {
    pub async fn list_posts(&self, filter: &PostFilter, ordering: Option<&str>) -> AppResult<Vec<PostRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
        qb.push(" WHERE 1 = 1");
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY ");
        qb.push(POST_ORDERING.order_by_clause(ordering, "p"));

        debug!("Listing posts: {}", qb.sql());
        let posts = qb.build_query_as::<PostRecord>().fetch_all(&self.pool).await?;
        Ok(posts)
    }

    pub async fn get_post(&self, id: i64, published_only: bool) -> AppResult<Option<PostRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);
        PostFilter {
            published_only,
            ..PostFilter::default()
        }
        .push_conditions(&mut qb);

        let post = qb.build_query_as::<PostRecord>().fetch_optional(&self.pool).await?;
        Ok(post)
    }

    pub async fn slug_exists(&self, slug: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Adds one view in place, so concurrent readers never lose an increment.
    /// Returns false when no visible post has that id. `updated_at` is not touched.
    pub async fn increment_view_count(&self, id: i64, published_only: bool) -> AppResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET view_count = view_count + 1 WHERE id = ");
        qb.push_bind(id);
        if published_only {
            qb.push(" AND status = ");
            qb.push_bind(PostStatus::Published);
        }

        let result = qb.build().execute(&self.pool).await?;
        debug!(post_id = id, "view_count incremented");
        Ok(result.rows_affected() > 0)
    }

    /// Inserts the post and its tags, returning the new id.
    ///
    /// Derived slugs that collide get a numeric suffix (`-2`, `-3`, ...). The
    /// UNIQUE index stays authoritative: losing an insert race moves on to the
    /// next suffix. An explicit slug that collides is a validation error.
    pub async fn create_post(&self, author_id: i64, post: &NewPost) -> AppResult<i64> {
        let (base, derived) = match &post.slug {
            Some(slug) => (slug.clone(), false),
            None => (slugify(&post.title), true),
        };

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let slug = if derived {
                slug_candidate(&base, attempt)
            } else {
                base.clone()
            };

            if derived && self.slug_exists(&slug).await? {
                continue;
            }

            match self.insert_post(author_id, &slug, post).await {
                Ok(id) => {
                    debug!(post_id = id, slug = %slug, "post inserted");
                    return Ok(id);
                }
                Err(e) if is_unique_violation(&e) && derived => {
                    debug!(slug = %slug, "slug taken concurrently, trying next suffix");
                }
                Err(e) if is_unique_violation(&e) => {
                    return Err(AppError::field("slug", "post with this slug already exists."));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::field(
            "title",
            "Could not derive a unique slug from this title.",
        ))
    }

    async fn insert_post(&self, author_id: i64, slug: &str, post: &NewPost) -> sqlx::Result<i64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO posts (title, slug, content, excerpt, author_id, category_id, status,
                                featured_image, is_featured, view_count, created_at, updated_at, published_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(&post.title)
        .bind(slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(author_id)
        .bind(post.category_id)
        .bind(post.status)
        .bind(&post.featured_image)
        .bind(post.is_featured)
        .bind(now)
        .bind(now)
        .bind(post.published_at)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        replace_post_tags(&mut tx, id, &post.tag_ids).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Applies `changes` and the tag set (if given) in one transaction.
    /// Returns false when the post does not exist.
    pub async fn update_post(&self, id: i64, changes: &PostChanges) -> AppResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET ");
        let mut assignments = qb.separated(", ");

        if let Some(title) = &changes.title {
            assignments.push("title = ");
            assignments.push_bind_unseparated(title.clone());
        }
        if let Some(content) = &changes.content {
            assignments.push("content = ");
            assignments.push_bind_unseparated(content.clone());
        }
        if let Some(excerpt) = &changes.excerpt {
            assignments.push("excerpt = ");
            assignments.push_bind_unseparated(excerpt.clone());
        }
        if let Some(category_id) = changes.category_id {
            assignments.push("category_id = ");
            assignments.push_bind_unseparated(category_id);
        }
        if let Some(status) = changes.status {
            assignments.push("status = ");
            assignments.push_bind_unseparated(status);
        }
        if let Some(featured_image) = &changes.featured_image {
            assignments.push("featured_image = ");
            assignments.push_bind_unseparated(featured_image.clone());
        }
        if let Some(is_featured) = changes.is_featured {
            assignments.push("is_featured = ");
            assignments.push_bind_unseparated(is_featured);
        }
        if let Some(published_at) = changes.published_at {
            assignments.push("published_at = ");
            assignments.push_bind_unseparated(published_at);
        }
        assignments.push("updated_at = ");
        assignments.push_bind_unseparated(Utc::now());

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let mut tx = self.pool.begin().await?;
        let result = qb.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        if let Some(tag_ids) = &changes.tag_ids {
            replace_post_tags(&mut tx, id, tag_ids).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Comments and tag memberships go with the post.
    pub async fn delete_post(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Explicit reset, the only way view_count ever goes down.
    pub async fn reset_view_count(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE posts SET view_count = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn blog_stats(&self) -> AppResult<BlogStats> {
        let stats = sqlx::query_as::<_, BlogStats>(
            "SELECT
                (SELECT COUNT(*) FROM posts WHERE status = 'published') AS total_posts,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM tags) AS total_tags,
                (SELECT COUNT(*) FROM comments WHERE is_approved = 1) AS total_comments,
                (SELECT COUNT(*) FROM posts WHERE status = 'published' AND is_featured = 1) AS featured_posts",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}
