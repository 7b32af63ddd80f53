// Comments - per-post reply trees

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    framework::listing::OrderingFields,
    models::CommentRecord,
};

pub const COMMENT_ORDERING: OrderingFields = OrderingFields::new(&["created_at"], &["created_at"]);

/// Deepest level a reply may sit at. Top-level comments are depth 0.
pub const MAX_REPLY_DEPTH: i64 = 32;

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.author_id, c.parent_id, c.content, c.is_approved, c.created_at, c.updated_at";

impl BlogDatabase {
    /// Every comment on the post, approved or not, oldest first.
    /// This is the one query a reply tree is built from.
    pub async fn comments_for_post(&self, post_id: i64) -> AppResult<Vec<CommentRecord>> {
        let comments = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM comments c WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// Approved comments on the post, replies included.
    pub async fn list_approved_comments(&self, post_id: i64, ordering: Option<&str>) -> AppResult<Vec<CommentRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM comments c WHERE c.is_approved = 1 AND c.post_id = ",
            COMMENT_COLUMNS
        ));
        qb.push_bind(post_id);
        qb.push(" ORDER BY ");
        qb.push(COMMENT_ORDERING.order_by_clause(ordering, "c"));

        let comments = qb.build_query_as::<CommentRecord>().fetch_all(&self.pool).await?;
        Ok(comments)
    }

    /// An approved comment of the given post; anything else reads as missing.
    pub async fn get_approved_comment(&self, post_id: i64, id: i64) -> AppResult<Option<CommentRecord>> {
        let comment = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM comments c WHERE c.id = ? AND c.post_id = ? AND c.is_approved = 1",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    /// Whether `id` is a comment on `post_id` (approval not required).
    pub async fn comment_belongs_to_post(&self, id: i64, post_id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM comments WHERE id = ? AND post_id = ?")
            .bind(id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Inserts an approved comment. A reply that would sit deeper than
    /// `MAX_REPLY_DEPTH` is rejected on `parent`.
    pub async fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> AppResult<CommentRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO comments (post_id, author_id, parent_id, content, is_approved, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(parent_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // The insert holds the write lock, so no re-parent can deepen the chain meanwhile.
        if let Some(parent_id) = parent_id {
            if depth_of(&mut *tx, parent_id).await? + 1 > MAX_REPLY_DEPTH {
                return Err(too_deep());
            }
        }
        tx.commit().await?;

        self.get_comment(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("comment vanished after insert".to_string()))
    }

    pub async fn get_comment(&self, id: i64) -> AppResult<Option<CommentRecord>> {
        let comment = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM comments c WHERE c.id = ?",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    /// `parent: Some(None)` detaches the comment to the top level.
    ///
    /// A new parent is checked and written in one transaction: moving a
    /// comment under itself or one of its replies, or past
    /// `MAX_REPLY_DEPTH`, is rejected on `parent`.
    pub async fn update_comment(
        &self,
        id: i64,
        content: Option<&str>,
        parent: Option<Option<i64>>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction owns the write lock before the tree is read.
        let touched = sqlx::query("UPDATE comments SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(Some(parent_id)) = parent {
            if closes_cycle(&mut *tx, id, parent_id).await? {
                return Err(AppError::field(
                    "parent",
                    "A comment cannot be a reply to itself or to one of its replies.",
                ));
            }
            let deepest = depth_of(&mut *tx, parent_id).await? + 1 + subtree_height(&mut *tx, id).await?;
            if deepest > MAX_REPLY_DEPTH {
                return Err(too_deep());
            }
        }

        if content.is_some() || parent.is_some() {
            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE comments SET ");
            let mut assignments = qb.separated(", ");
            if let Some(content) = content {
                assignments.push("content = ");
                assignments.push_bind_unseparated(content.to_string());
            }
            if let Some(parent_id) = parent {
                assignments.push("parent_id = ");
                assignments.push_bind_unseparated(parent_id);
            }
            qb.push(" WHERE id = ");
            qb.push_bind(id);
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Replies below the comment are removed with it.
    pub async fn delete_comment(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Moderation switch; not reachable from the public API.
    pub async fn set_comment_approval(&self, id: i64, is_approved: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE comments SET is_approved = ?, updated_at = ? WHERE id = ?")
            .bind(is_approved)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn too_deep() -> AppError {
    AppError::field(
        "parent",
        format!("Replies cannot be nested more than {} levels deep.", MAX_REPLY_DEPTH),
    )
}

// True when `candidate_parent` is `comment_id` itself or one of its
// descendants. UNION stops at a repeated row, so a corrupt cyclic chain
// still terminates.
async fn closes_cycle(conn: &mut SqliteConnection, comment_id: i64, candidate_parent: i64) -> sqlx::Result<bool> {
    let found: i64 = sqlx::query_scalar(
        "WITH RECURSIVE ancestors(id, parent_id) AS (
            SELECT id, parent_id FROM comments WHERE id = ?
            UNION
            SELECT c.id, c.parent_id FROM comments c JOIN ancestors a ON c.id = a.parent_id
        )
        SELECT EXISTS(SELECT 1 FROM ancestors WHERE id = ?)",
    )
    .bind(candidate_parent)
    .bind(comment_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(found != 0)
}

// Walks at most one level past the limit; that is enough to reject.
async fn depth_of(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<i64> {
    let depth: Option<i64> = sqlx::query_scalar(
        "WITH RECURSIVE chain(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM comments WHERE id = ?
            UNION ALL
            SELECT c.id, c.parent_id, ch.depth + 1 FROM comments c JOIN chain ch ON c.id = ch.parent_id
            WHERE ch.depth <= ?
        )
        SELECT MAX(depth) FROM chain",
    )
    .bind(id)
    .bind(MAX_REPLY_DEPTH)
    .fetch_one(&mut *conn)
    .await?;
    Ok(depth.unwrap_or(0))
}

// Levels of replies below the comment, 0 for a leaf.
async fn subtree_height(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<i64> {
    let height: Option<i64> = sqlx::query_scalar(
        "WITH RECURSIVE below(id, depth) AS (
            SELECT id, 0 FROM comments WHERE id = ?
            UNION ALL
            SELECT c.id, b.depth + 1 FROM comments c JOIN below b ON c.parent_id = b.id
            WHERE b.depth <= ?
        )
        SELECT MAX(depth) FROM below",
    )
    .bind(id)
    .bind(MAX_REPLY_DEPTH)
    .fetch_one(&mut *conn)
    .await?;
    Ok(height.unwrap_or(0))
}
