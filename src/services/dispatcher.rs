//! Fans composed announcements out to subscribed channels.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use futures::future::join_all;
use sqlx::SqlitePool;

use crate::db::{ChannelSubscription, ChannelSubscriptionRepository, WorkspaceRepository};
use crate::error::{AppError, AppResult};
use crate::services::message::AnnouncementMessage;
use crate::services::slack::SlackApi;
use crate::AppState;

/// A channel that did not receive every announcement of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub channel_id: String,
    pub cause: String,
}

fn describe(error: &AppError) -> String {
    match error {
        AppError::Internal(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

pub struct Dispatcher {
    pool: SqlitePool,
    slack: Arc<dyn SlackApi>,
}

impl Dispatcher {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            slack: state.slack.clone(),
        }
    }

    /// Post every message to every channel subscribed for `now`'s UTC hour.
    pub async fn broadcast(
        &self,
        messages: &[AnnouncementMessage],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DispatchError>> {
        let subscriptions = ChannelSubscriptionRepository::find_by_hour(&self.pool, now.hour()).await?;
        if subscriptions.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.dispatch(&subscriptions, messages).await)
    }

    /// Channels are processed concurrently; messages within one channel are
    /// posted in order and the first failure ends that channel.
    async fn dispatch(
        &self,
        subscriptions: &[ChannelSubscription],
        messages: &[AnnouncementMessage],
    ) -> Vec<DispatchError> {
        let results = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.dispatch_channel(subscription, messages)),
        )
        .await;

        results
            .into_iter()
            .zip(subscriptions)
            .filter_map(|(result, subscription)| {
                result.err().map(|e| DispatchError {
                    channel_id: subscription.channel_id.clone(),
                    cause: describe(&e),
                })
            })
            .collect()
    }

    async fn dispatch_channel(
        &self,
        subscription: &ChannelSubscription,
        messages: &[AnnouncementMessage],
    ) -> AppResult<()> {
        let workspace = WorkspaceRepository::find_by_id(&self.pool, &subscription.workspace_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "No bot credentials for workspace {}",
                    subscription.workspace_id
                ))
            })?;

        for message in messages {
            self.slack
                .post_message(&workspace.bot_access_token, &subscription.channel_id, message)
                .await?;
        }

        tracing::debug!(
            "Posted {} announcement(s) to channel {}",
            messages.len(),
            subscription.channel_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        seed_subscription, seed_workspace, test_state, FakeFeed, FakeSlack,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 11, 19, 13, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn posts_messages_in_order_to_matching_channels_only() {
        let slack = Arc::new(FakeSlack::default());
        let state = test_state(Arc::new(FakeFeed::default()), slack.clone()).await;
        seed_workspace(&state.db, "T1", "xoxb-1").await;
        seed_subscription(&state.db, "C13", "T1", 13).await;
        seed_subscription(&state.db, "C14", "T1", 14).await;

        let messages = vec![
            AnnouncementMessage::text("first"),
            AnnouncementMessage::text("second"),
        ];
        let errors = Dispatcher::new(&state)
            .broadcast(&messages, now())
            .await
            .unwrap();

        assert!(errors.is_empty());
        let posted = slack.posted();
        assert_eq!(posted.len(), 2);
        assert!(posted.iter().all(|p| p.channel == "C13" && p.bot_token == "xoxb-1"));
        assert_eq!(posted[0].message.text, "first");
        assert_eq!(posted[1].message.text, "second");
    }

    #[tokio::test]
    async fn failures_are_isolated_per_channel() {
        let slack = Arc::new(FakeSlack::failing_on(&["CBAD"]));
        let state = test_state(Arc::new(FakeFeed::default()), slack.clone()).await;
        seed_workspace(&state.db, "T1", "xoxb-1").await;
        seed_subscription(&state.db, "CBAD", "T1", 13).await;
        seed_subscription(&state.db, "CGOOD", "T1", 13).await;
        seed_subscription(&state.db, "CORPHAN", "T-missing", 13).await;

        let errors = Dispatcher::new(&state)
            .broadcast(&[AnnouncementMessage::text("launch")], now())
            .await
            .unwrap();

        let mut failed: Vec<&str> = errors.iter().map(|e| e.channel_id.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["CBAD", "CORPHAN"]);
        assert!(errors
            .iter()
            .any(|e| e.channel_id == "CBAD" && e.cause.contains("channel_not_found")));
        assert!(errors
            .iter()
            .any(|e| e.channel_id == "CORPHAN" && e.cause.contains("T-missing")));

        let posted = slack.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].channel, "CGOOD");
    }

    #[tokio::test]
    async fn no_subscribers_posts_nothing() {
        let slack = Arc::new(FakeSlack::default());
        let state = test_state(Arc::new(FakeFeed::default()), slack.clone()).await;

        let errors = Dispatcher::new(&state)
            .broadcast(&[AnnouncementMessage::text("launch")], now())
            .await
            .unwrap();
        assert!(errors.is_empty());
        assert!(slack.posted().is_empty());
    }
}
