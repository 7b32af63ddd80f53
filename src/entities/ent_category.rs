// Categories - CRUD plus the live published-post count

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    framework::listing::{push_search, OrderingFields},
};
use crate::models::Category;

pub const CATEGORY_ORDERING: OrderingFields =
    OrderingFields::new(&["name", "created_at"], &["name"]);

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, \
     (SELECT COUNT(*) FROM posts p WHERE p.category_id = c.id AND p.status = 'published') AS posts_count, \
     c.created_at, c.updated_at \
     FROM categories c";

const DUPLICATE_NAME: &str = "category with this name already exists.";

impl BlogDatabase {
    pub async fn list_categories(&self, search: &[String], ordering: Option<&str>) -> AppResult<Vec<Category>> {
        let mut qb = QueryBuilder::<Sqlite>::new(CATEGORY_SELECT);
        qb.push(" WHERE 1 = 1");
        push_search(&mut qb, search, &["c.name", "c.description"]);
        qb.push(" ORDER BY ");
        qb.push(CATEGORY_ORDERING.order_by_clause(ordering, "c"));

        let categories = qb.build_query_as::<Category>().fetch_all(&self.pool).await?;
        Ok(categories)
    }

    pub async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!("{} WHERE c.id = ?", CATEGORY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn categories_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, Category>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(CATEGORY_SELECT);
        qb.push(" WHERE c.id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let categories = qb.build_query_as::<Category>().fetch_all(&self.pool).await?;
        Ok(categories.into_iter().map(|c| (c.id, c)).collect())
    }

    pub async fn category_exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn create_category(&self, name: &str, description: &str) -> AppResult<Category> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_or(e, "name", DUPLICATE_NAME))?;

        self.get_category(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("category vanished after insert".to_string()))
    }

    /// Applies whichever fields are given; returns false when the row is gone.
    pub async fn update_category(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE categories
             SET name = COALESCE(?, name), description = COALESCE(?, description), updated_at = ?
             WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_or(e, "name", DUPLICATE_NAME))?;
        Ok(result.rows_affected() > 0)
    }

    /// Posts in the category keep existing with `category_id` set to NULL.
    pub async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
