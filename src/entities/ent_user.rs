// Users - read side of the identity subsystem's accounts

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    infrastructure::middleware::IdentityProvider,
    models::{AuthenticatedUser, NewUser, UserSummary},
};

const USER_SUMMARY_COLUMNS: &str = "id, username, email, first_name, last_name, date_joined";

impl BlogDatabase {
    /// Registers an account. Normally the authentication subsystem does this;
    /// the service itself only calls it from seeding.
    pub async fn create_user(&self, user: NewUser) -> AppResult<UserSummary> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, is_staff, api_token, date_joined)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .bind(&user.api_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_or(e, "username", "A user with that username already exists."))?;

        self.get_user(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Internal("user vanished after insert".to_string()))
    }

    pub async fn get_user(&self, id: i64) -> AppResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_SUMMARY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_SUMMARY_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Batch lookup used when assembling authors for a page of results.
    pub async fn users_by_ids(&self, ids: &[i64]) -> AppResult<HashMap<i64, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM users WHERE id IN (",
            USER_SUMMARY_COLUMNS
        ));
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let users = qb
            .build_query_as::<UserSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users.into_iter().map(|user| (user.id, user)).collect())
    }

    /// Removing an account cascades to its posts, comments and profile.
    pub async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityProvider for BlogDatabase {
    async fn resolve_token(&self, token: &str) -> AppResult<Option<AuthenticatedUser>> {
        let user = sqlx::query_as::<_, AuthenticatedUser>(
            "SELECT id, username, is_staff FROM users WHERE api_token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
