use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{CreateWorkspaceCredential, WorkspaceCredential};
use crate::error::{AppError, AppResult};

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    /// Store the credentials of a fresh install. A re-install replaces the row.
    pub async fn upsert(
        pool: &SqlitePool,
        workspace: CreateWorkspaceCredential,
    ) -> AppResult<WorkspaceCredential> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, WorkspaceCredential>(
            r#"
            INSERT INTO workspaces (
                workspace_id, workspace_name, installing_user_id,
                bot_user_id, bot_access_token, workspace_access_token,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(workspace_id) DO UPDATE SET
                workspace_name = excluded.workspace_name,
                installing_user_id = excluded.installing_user_id,
                bot_user_id = excluded.bot_user_id,
                bot_access_token = excluded.bot_access_token,
                workspace_access_token = excluded.workspace_access_token,
                updated_at = excluded.updated_at
            RETURNING
                workspace_id, workspace_name, installing_user_id,
                bot_user_id, bot_access_token, workspace_access_token,
                created_at, updated_at
            "#,
        )
        .bind(&workspace.workspace_id)
        .bind(&workspace.workspace_name)
        .bind(&workspace.installing_user_id)
        .bind(&workspace.bot_user_id)
        .bind(&workspace.bot_access_token)
        .bind(&workspace.workspace_access_token)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        workspace_id: &str,
    ) -> AppResult<Option<WorkspaceCredential>> {
        sqlx::query_as::<_, WorkspaceCredential>(
            r#"
            SELECT
                workspace_id, workspace_name, installing_user_id,
                bot_user_id, bot_access_token, workspace_access_token,
                created_at, updated_at
            FROM workspaces
            WHERE workspace_id = ?
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }
}
