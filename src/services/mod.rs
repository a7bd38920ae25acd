pub mod announcements;
pub mod authorization;
pub mod commands;
pub mod composer;
pub mod dispatcher;
pub mod init;
pub mod launch_feed;
pub mod message;
pub mod reminders;
pub mod signature;
pub mod slack;
pub mod window;

/// In-process fakes for the outbound seams, shared by service and route tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use sqlx::SqlitePool;

    use crate::config::Config;
    use crate::db::{
        ChannelSubscriptionRepository, CreateChannelSubscription, CreateWorkspaceCredential,
        WorkspaceRepository,
    };
    use crate::error::{AppError, AppResult};
    use crate::services::launch_feed::{EventRef, LaunchEvent, LaunchFeed};
    use crate::services::message::AnnouncementMessage;
    use crate::services::slack::{OAuthAccess, ReminderPostOutcome, SlackApi};
    use crate::AppState;

    pub const VERIFICATION_TOKEN: &str = "vtoken";
    pub const STATE_SECRET: &str = "state-secret";

    #[derive(Default)]
    pub struct FakeFeed {
        /// `None` makes `fetch_upcoming` fail.
        pub upcoming: Option<Vec<LaunchEvent>>,
        pub by_ref: HashMap<String, LaunchEvent>,
        pub upcoming_calls: AtomicUsize,
    }

    impl FakeFeed {
        pub fn with_upcoming(events: Vec<LaunchEvent>) -> Self {
            Self {
                upcoming: Some(events),
                ..Default::default()
            }
        }

        pub fn with_event(event: LaunchEvent) -> Self {
            let mut by_ref = HashMap::new();
            by_ref.insert(event.reference().to_string(), event);
            Self {
                upcoming: Some(Vec::new()),
                by_ref,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.upcoming_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LaunchFeed for FakeFeed {
        async fn fetch_upcoming(&self) -> AppResult<Vec<LaunchEvent>> {
            self.upcoming_calls.fetch_add(1, Ordering::SeqCst);
            self.upcoming
                .clone()
                .ok_or_else(|| AppError::FeedUnavailable("feed down".to_string()))
        }

        async fn fetch_event(&self, event: &EventRef) -> AppResult<LaunchEvent> {
            self.by_ref
                .get(&event.to_string())
                .cloned()
                .ok_or_else(|| AppError::FeedUnavailable(format!("{} not found", event)))
        }
    }

    #[derive(Debug, Clone)]
    pub struct PostedMessage {
        pub bot_token: String,
        pub channel: String,
        pub message: AnnouncementMessage,
    }

    #[derive(Debug, Clone)]
    pub struct RequestedReminder {
        pub personal_token: String,
        pub text: String,
        pub fire_time: DateTime<Utc>,
    }

    pub struct FakeSlack {
        pub posted: Mutex<Vec<PostedMessage>>,
        pub reminders: Mutex<Vec<RequestedReminder>>,
        pub failing_channels: HashSet<String>,
        pub reminder_outcome: Mutex<ReminderPostOutcome>,
        pub oauth: Option<OAuthAccess>,
    }

    impl Default for FakeSlack {
        fn default() -> Self {
            Self {
                posted: Mutex::new(Vec::new()),
                reminders: Mutex::new(Vec::new()),
                failing_channels: HashSet::new(),
                reminder_outcome: Mutex::new(ReminderPostOutcome::Ok),
                oauth: None,
            }
        }
    }

    impl FakeSlack {
        pub fn failing_on(channels: &[&str]) -> Self {
            Self {
                failing_channels: channels.iter().map(|c| c.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn with_oauth(access: OAuthAccess) -> Self {
            Self {
                oauth: Some(access),
                ..Default::default()
            }
        }

        pub fn set_reminder_outcome(&self, outcome: ReminderPostOutcome) {
            *self.reminder_outcome.lock().unwrap() = outcome;
        }

        pub fn posted(&self) -> Vec<PostedMessage> {
            self.posted.lock().unwrap().clone()
        }

        pub fn reminders(&self) -> Vec<RequestedReminder> {
            self.reminders.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SlackApi for FakeSlack {
        async fn post_message(
            &self,
            bot_token: &str,
            channel: &str,
            message: &AnnouncementMessage,
        ) -> AppResult<()> {
            if self.failing_channels.contains(channel) {
                return Err(AppError::slack("chat.postMessage", "channel_not_found"));
            }
            self.posted.lock().unwrap().push(PostedMessage {
                bot_token: bot_token.to_string(),
                channel: channel.to_string(),
                message: message.clone(),
            });
            Ok(())
        }

        async fn add_reminder(
            &self,
            personal_token: &str,
            text: &str,
            fire_time: DateTime<Utc>,
        ) -> AppResult<ReminderPostOutcome> {
            self.reminders.lock().unwrap().push(RequestedReminder {
                personal_token: personal_token.to_string(),
                text: text.to_string(),
                fire_time,
            });
            Ok(self.reminder_outcome.lock().unwrap().clone())
        }

        async fn exchange_code(&self, _code: &str) -> AppResult<OAuthAccess> {
            self.oauth
                .clone()
                .ok_or_else(|| AppError::slack("oauth.access", "connection refused"))
        }
    }

    pub fn test_config() -> Config {
        let mut config = Config::default();
        config.slack.client_id = "cid".to_string();
        config.slack.client_secret = "csecret".to_string();
        config.slack.verification_token = VERIFICATION_TOKEN.to_string();
        config.state.secret = STATE_SECRET.to_string();
        config
    }

    pub async fn test_state(feed: Arc<FakeFeed>, slack: Arc<FakeSlack>) -> Arc<AppState> {
        test_state_with_config(test_config(), feed, slack).await
    }

    pub async fn test_state_with_config(
        config: Config,
        feed: Arc<FakeFeed>,
        slack: Arc<FakeSlack>,
    ) -> Arc<AppState> {
        Arc::new(AppState {
            db: crate::db::test_pool().await,
            config,
            feed,
            slack,
        })
    }

    pub async fn seed_workspace(pool: &SqlitePool, workspace_id: &str, bot_token: &str) {
        WorkspaceRepository::upsert(
            pool,
            CreateWorkspaceCredential {
                workspace_id: workspace_id.to_string(),
                workspace_name: "Rockets".to_string(),
                installing_user_id: "U0".to_string(),
                bot_user_id: "B0".to_string(),
                bot_access_token: bot_token.to_string(),
                workspace_access_token: "xoxp-install".to_string(),
            },
        )
        .await
        .unwrap();
    }

    pub async fn seed_subscription(
        pool: &SqlitePool,
        channel_id: &str,
        workspace_id: &str,
        hour: u32,
    ) {
        ChannelSubscriptionRepository::upsert(
            pool,
            CreateChannelSubscription {
                channel_id: channel_id.to_string(),
                channel_name: format!("#{}", channel_id),
                workspace_id: workspace_id.to_string(),
                workspace_domain: "rockets".to_string(),
                subscribing_user_id: "U1".to_string(),
                subscribing_user_name: "ada".to_string(),
                hour_of_day: hour,
            },
        )
        .await
        .unwrap();
    }
}
