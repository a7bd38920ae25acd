use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{ChannelSubscription, CreateChannelSubscription};
use crate::error::{AppError, AppResult};

pub struct ChannelSubscriptionRepository;

impl ChannelSubscriptionRepository {
    /// Enroll a channel. Subscribing an enrolled channel again replaces its hour.
    pub async fn upsert(
        pool: &SqlitePool,
        subscription: CreateChannelSubscription,
    ) -> AppResult<ChannelSubscription> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, ChannelSubscription>(
            r#"
            INSERT INTO channel_subscriptions (
                channel_id, channel_name, workspace_id, workspace_domain,
                subscribing_user_id, subscribing_user_name, hour_of_day,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET
                channel_name = excluded.channel_name,
                workspace_id = excluded.workspace_id,
                workspace_domain = excluded.workspace_domain,
                subscribing_user_id = excluded.subscribing_user_id,
                subscribing_user_name = excluded.subscribing_user_name,
                hour_of_day = excluded.hour_of_day,
                updated_at = excluded.updated_at
            RETURNING
                channel_id, channel_name, workspace_id, workspace_domain,
                subscribing_user_id, subscribing_user_name, hour_of_day,
                created_at, updated_at
            "#,
        )
        .bind(&subscription.channel_id)
        .bind(&subscription.channel_name)
        .bind(&subscription.workspace_id)
        .bind(&subscription.workspace_domain)
        .bind(&subscription.subscribing_user_id)
        .bind(&subscription.subscribing_user_name)
        .bind(subscription.hour_of_day as i64)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Withdraw a channel. Unknown channels are not an error.
    pub async fn delete(pool: &SqlitePool, channel_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM channel_subscriptions WHERE channel_id = ?")
            .bind(channel_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    #[cfg(test)]
    pub async fn find_by_channel_id(
        pool: &SqlitePool,
        channel_id: &str,
    ) -> AppResult<Option<ChannelSubscription>> {
        sqlx::query_as::<_, ChannelSubscription>(
            r#"
            SELECT
                channel_id, channel_name, workspace_id, workspace_domain,
                subscribing_user_id, subscribing_user_name, hour_of_day,
                created_at, updated_at
            FROM channel_subscriptions
            WHERE channel_id = ?
            "#,
        )
        .bind(channel_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// All channels enrolled for the given UTC hour (served by the hour index).
    pub async fn find_by_hour(
        pool: &SqlitePool,
        hour_of_day: u32,
    ) -> AppResult<Vec<ChannelSubscription>> {
        sqlx::query_as::<_, ChannelSubscription>(
            r#"
            SELECT
                channel_id, channel_name, workspace_id, workspace_domain,
                subscribing_user_id, subscribing_user_name, hour_of_day,
                created_at, updated_at
            FROM channel_subscriptions
            WHERE hour_of_day = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(hour_of_day as i64)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
