// Tags - CRUD, post membership and the live published-post count

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{HashMap, HashSet};

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    framework::listing::{push_search, OrderingFields},
    models::Tag,
};

pub const TAG_ORDERING: OrderingFields = OrderingFields::new(&["name", "created_at"], &["name"]);

const TAG_COLUMNS: &str = "t.id, t.name, t.color, \
     (SELECT COUNT(*) FROM post_tags m JOIN posts q ON q.id = m.post_id \
      WHERE m.tag_id = t.id AND q.status = 'published') AS posts_count, \
     t.created_at";

const DUPLICATE_NAME: &str = "tag with this name already exists.";

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: i64,
    #[sqlx(flatten)]
    tag: Tag,
}

impl BlogDatabase {
    pub async fn list_tags(&self, search: &[String], ordering: Option<&str>) -> AppResult<Vec<Tag>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM tags t WHERE 1 = 1", TAG_COLUMNS));
        push_search(&mut qb, search, &["t.name"]);
        qb.push(" ORDER BY ");
        qb.push(TAG_ORDERING.order_by_clause(ordering, "t"));

        let tags = qb.build_query_as::<Tag>().fetch_all(&self.pool).await?;
        Ok(tags)
    }

    pub async fn get_tag(&self, id: i64) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags t WHERE t.id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn create_tag(&self, name: &str, color: &str) -> AppResult<Tag> {
        let result = sqlx::query("INSERT INTO tags (name, color, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(color)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::unique_or(e, "name", DUPLICATE_NAME))?;

        self.get_tag(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("tag vanished after insert".to_string()))
    }

    pub async fn update_tag(&self, id: i64, name: Option<&str>, color: Option<&str>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tags SET name = COALESCE(?, name), color = COALESCE(?, color) WHERE id = ?",
        )
        .bind(name)
        .bind(color)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_or(e, "name", DUPLICATE_NAME))?;
        Ok(result.rows_affected() > 0)
    }

    /// Membership rows go with the tag; the posts stay.
    pub async fn delete_tag(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ids from `ids` that do not name an existing tag, in request order.
    pub async fn missing_tag_ids(&self, ids: &[i64]) -> AppResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let found: HashSet<i64> = qb
            .build_query_scalar::<i64>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect();

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    /// Tags of each given post, ordered by name.
    pub async fn tags_for_posts(&self, post_ids: &[i64]) -> AppResult<HashMap<i64, Vec<Tag>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT pt.post_id, {} FROM post_tags pt JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id IN (",
            TAG_COLUMNS
        ));
        let mut separated = qb.separated(",");
        for id in post_ids {
            separated.push_bind(*id);
        }
        qb.push(") ORDER BY t.name, t.id");

        let rows = qb.build_query_as::<PostTagRow>().fetch_all(&self.pool).await?;

        let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_post.entry(row.post_id).or_default().push(row.tag);
        }
        Ok(by_post)
    }
}

/// Replaces a post's tag set wholesale. Runs on the caller's transaction.
pub(crate) async fn replace_post_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    tag_ids: &[i64],
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    let unique: HashSet<i64> = tag_ids.iter().copied().collect();
    for tag_id in unique {
        sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
