use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{CreateUserReminderGrant, UserReminderGrant};
use crate::error::{AppError, AppResult};

pub struct ReminderGrantRepository;

impl ReminderGrantRepository {
    pub async fn upsert(
        pool: &SqlitePool,
        grant: CreateUserReminderGrant,
    ) -> AppResult<UserReminderGrant> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, UserReminderGrant>(
            r#"
            INSERT INTO reminder_grants (
                user_id, user_name, workspace_id, personal_access_token,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                user_name = excluded.user_name,
                workspace_id = excluded.workspace_id,
                personal_access_token = excluded.personal_access_token,
                updated_at = excluded.updated_at
            RETURNING
                user_id, user_name, workspace_id, personal_access_token,
                created_at, updated_at
            "#,
        )
        .bind(&grant.user_id)
        .bind(&grant.user_name)
        .bind(&grant.workspace_id)
        .bind(&grant.personal_access_token)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<UserReminderGrant>> {
        sqlx::query_as::<_, UserReminderGrant>(
            r#"
            SELECT
                user_id, user_name, workspace_id, personal_access_token,
                created_at, updated_at
            FROM reminder_grants
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM reminder_grants WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}
