// User profiles - one per user, created on first access

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    models::ProfileRecord,
};

const PROFILE_COLUMNS: &str = "id, user_id, bio, avatar, website, location, birth_date, \
     is_verified, created_at, updated_at";

/// Profile field changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub bio: Option<String>,
    pub avatar: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub location: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
}

impl BlogDatabase {
    /// Returns the user's profile, creating an empty one first if needed.
    /// The insert is a no-op when the profile already exists, so concurrent
    /// first requests still end up with a single row.
    pub async fn get_or_create_profile(&self, user_id: i64) -> AppResult<ProfileRecord> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_profiles (user_id, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let profile = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = ?",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Explicit creation; a second profile for the same user is rejected.
    pub async fn create_profile(&self, user_id: i64, changes: &ProfileChanges) -> AppResult<ProfileRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO user_profiles (user_id, bio, avatar, website, location, birth_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(changes.bio.clone().unwrap_or_default())
        .bind(changes.avatar.clone().flatten())
        .bind(changes.website.clone().flatten())
        .bind(changes.location.clone().unwrap_or_default())
        .bind(changes.birth_date.flatten())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::unique_or(e, "user", "This user already has a profile."))?;

        self.get_profile(result.last_insert_rowid(), None)
            .await?
            .ok_or_else(|| AppError::Internal("profile vanished after insert".to_string()))
    }

    /// `owner: Some(user_id)` narrows the lookup to that user's profile.
    pub async fn get_profile(&self, id: i64, owner: Option<i64>) -> AppResult<Option<ProfileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM user_profiles WHERE id = ",
            PROFILE_COLUMNS
        ));
        qb.push_bind(id);
        if let Some(user_id) = owner {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }

        let profile = qb.build_query_as::<ProfileRecord>().fetch_optional(&self.pool).await?;
        Ok(profile)
    }

    pub async fn list_profiles(&self, owner: Option<i64>) -> AppResult<Vec<ProfileRecord>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM user_profiles", PROFILE_COLUMNS));
        if let Some(user_id) = owner {
            qb.push(" WHERE user_id = ");
            qb.push_bind(user_id);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let profiles = qb.build_query_as::<ProfileRecord>().fetch_all(&self.pool).await?;
        Ok(profiles)
    }

    pub async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> AppResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE user_profiles SET ");
        let mut assignments = qb.separated(", ");
        if let Some(bio) = &changes.bio {
            assignments.push("bio = ");
            assignments.push_bind_unseparated(bio.clone());
        }
        if let Some(avatar) = &changes.avatar {
            assignments.push("avatar = ");
            assignments.push_bind_unseparated(avatar.clone());
        }
        if let Some(website) = &changes.website {
            assignments.push("website = ");
            assignments.push_bind_unseparated(website.clone());
        }
        if let Some(location) = &changes.location {
            assignments.push("location = ");
            assignments.push_bind_unseparated(location.clone());
        }
        if let Some(birth_date) = changes.birth_date {
            assignments.push("birth_date = ");
            assignments.push_bind_unseparated(birth_date);
        }
        assignments.push("updated_at = ");
        assignments.push_bind_unseparated(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_profile(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_profiles_for_user(&self, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
