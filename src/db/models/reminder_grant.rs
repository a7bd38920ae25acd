use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A personal token that lets the bot create reminders on a user's behalf.
/// Absence of a grant means the user has to (re)authorize.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserReminderGrant {
    pub user_id: String,
    pub user_name: String,
    pub workspace_id: String,
    pub personal_access_token: String,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserReminderGrant {
    pub user_id: String,
    pub user_name: String,
    pub workspace_id: String,
    pub personal_access_token: String,
}
