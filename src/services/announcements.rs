//! The hourly announcement tick: feed → window filter → composer → dispatcher.

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;

use crate::db::ChannelSubscriptionRepository;
use crate::error::AppResult;
use crate::services::composer::compose;
use crate::services::dispatcher::{DispatchError, Dispatcher};
use crate::services::launch_feed::LaunchFeed;
use crate::services::window::is_announceable;
use crate::AppState;

#[derive(Debug, Default)]
pub struct TickReport {
    pub channels: usize,
    pub announced: usize,
    pub errors: Vec<DispatchError>,
}

pub struct AnnouncementService {
    pool: SqlitePool,
    feed: Arc<dyn LaunchFeed>,
    dispatcher: Dispatcher,
    timezone: Tz,
}

impl AnnouncementService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            feed: state.feed.clone(),
            dispatcher: Dispatcher::new(state),
            timezone: state.config.notifications.timezone,
        }
    }

    /// Announce upcoming launches to every channel subscribed for `now`'s hour.
    /// A feed failure aborts the tick before anything is posted.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> AppResult<TickReport> {
        let subscriptions = ChannelSubscriptionRepository::find_by_hour(&self.pool, now.hour()).await?;
        if subscriptions.is_empty() {
            tracing::debug!("No channels subscribed for {}:00 UTC", now.hour());
            return Ok(TickReport::default());
        }

        let upcoming = self.feed.fetch_upcoming().await?;
        let messages: Vec<_> = upcoming
            .iter()
            .filter(|event| is_announceable(event, now))
            .map(|event| compose(event, self.timezone))
            .collect();

        tracing::info!(
            "Announcing {} of {} upcoming launches to {} channels",
            messages.len(),
            upcoming.len(),
            subscriptions.len()
        );

        let errors = self.dispatcher.broadcast(&messages, now).await?;
        for error in &errors {
            tracing::warn!(
                "Announcement to channel {} failed: {}",
                error.channel_id,
                error.cause
            );
        }

        Ok(TickReport {
            channels: subscriptions.len(),
            announced: messages.len(),
            errors,
        })
    }
}
