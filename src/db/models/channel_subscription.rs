use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChannelSubscription {
    pub channel_id: String,
    pub channel_name: String,
    pub workspace_id: String,
    pub workspace_domain: String,
    pub subscribing_user_id: String,
    pub subscribing_user_name: String,
    /// UTC hour (0..=23) at which the channel receives announcements
    pub hour_of_day: i64,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelSubscription {
    pub channel_id: String,
    pub channel_name: String,
    pub workspace_id: String,
    pub workspace_domain: String,
    pub subscribing_user_id: String,
    pub subscribing_user_name: String,
    pub hour_of_day: u32,
}
