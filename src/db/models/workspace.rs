use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bot credentials for a workspace, written once per install.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkspaceCredential {
    pub workspace_id: String,
    pub workspace_name: String,
    pub installing_user_id: String,
    pub bot_user_id: String,
    pub bot_access_token: String,
    pub workspace_access_token: String,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspaceCredential {
    pub workspace_id: String,
    pub workspace_name: String,
    pub installing_user_id: String,
    pub bot_user_id: String,
    pub bot_access_token: String,
    pub workspace_access_token: String,
}
