//! Personal "Remind Me" handling.
//!
//! Each request walks verify → resolve grant → fetch target → post reminder.
//! A revoked personal token deletes the grant and answers with a fresh
//! grant-access prompt; any other Slack failure is returned as an error.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;

use crate::db::ReminderGrantRepository;
use crate::error::{AppError, AppResult};
use crate::services::authorization::AuthorizationCoordinator;
use crate::services::composer::date_token;
use crate::services::launch_feed::{EventRef, LaunchEvent, LaunchFeed};
use crate::services::message::{ResponseMessage, VERIFICATION_ERROR_TEXT};
use crate::services::slack::{ReminderPostOutcome, SlackApi};
use crate::AppState;

/// Reminders fire this long before the window opens.
pub const REMINDER_LEAD_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    VerificationFailed(ResponseMessage),
    NeedsAuthorization(ResponseMessage),
    Reminded(ResponseMessage),
}

impl ReminderOutcome {
    pub fn into_response(self) -> ResponseMessage {
        match self {
            ReminderOutcome::VerificationFailed(msg)
            | ReminderOutcome::NeedsAuthorization(msg)
            | ReminderOutcome::Reminded(msg) => msg,
        }
    }
}

pub fn fire_time(event: &LaunchEvent) -> DateTime<Utc> {
    event.window_start - Duration::minutes(REMINDER_LEAD_MINUTES)
}

/// `"{name} is launching soon!"` plus live stream links when there are any.
pub fn reminder_text(event: &LaunchEvent) -> String {
    let numbered = event.video_links.len() > 1;
    let streams: Vec<String> = event
        .video_links
        .iter()
        .enumerate()
        .map(|(idx, url)| {
            if numbered {
                format!("<{}|live stream #{}>", url, idx + 1)
            } else {
                format!("<{}|live stream>", url)
            }
        })
        .collect();

    let watch = if streams.is_empty() {
        String::new()
    } else {
        format!("  Watch it! {}", streams.join(", "))
    };
    format!("{} is launching soon!{}.", event.name, watch)
}

pub struct ReminderService {
    pool: SqlitePool,
    feed: Arc<dyn LaunchFeed>,
    slack: Arc<dyn SlackApi>,
    authorization: AuthorizationCoordinator,
    verification_token: String,
    timezone: Tz,
}

impl ReminderService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            feed: state.feed.clone(),
            slack: state.slack.clone(),
            authorization: AuthorizationCoordinator::new(state),
            verification_token: state.config.slack.verification_token.clone(),
            timezone: state.config.notifications.timezone,
        }
    }

    pub async fn request_reminder(
        &self,
        event_id: &str,
        user: &ActingUser,
        workspace_id: &str,
        verification_token: &str,
    ) -> AppResult<ReminderOutcome> {
        if verification_token != self.verification_token {
            tracing::warn!("Reminder request from {} failed verification", user.id);
            return Ok(ReminderOutcome::VerificationFailed(ResponseMessage::failure(
                VERIFICATION_ERROR_TEXT,
            )));
        }

        let Some(grant) = ReminderGrantRepository::find_by_user_id(&self.pool, &user.id).await?
        else {
            tracing::debug!("No reminder grant for {}, prompting for access", user.id);
            return self.needs_authorization(user, workspace_id);
        };

        let event = self.feed.fetch_event(&EventRef::parse(event_id)).await?;
        let fire_at = fire_time(&event);
        let text = reminder_text(&event);

        match self
            .slack
            .add_reminder(&grant.personal_access_token, &text, fire_at)
            .await?
        {
            ReminderPostOutcome::Ok => {
                tracing::info!("Reminder for {} set by {}", event.name, user.id);
                Ok(ReminderOutcome::Reminded(
                    ResponseMessage::text(format!(
                        "Reminder for {} set for {}",
                        event.name,
                        date_token(fire_at, self.timezone)
                    ))
                    .ephemeral()
                    .keep_original(),
                ))
            }
            ReminderPostOutcome::Revoked(reason) => {
                tracing::info!(
                    "Reminder grant for {} no longer valid ({}), removing",
                    user.id,
                    reason
                );
                ReminderGrantRepository::delete(&self.pool, &user.id).await?;
                self.needs_authorization(user, workspace_id)
            }
            ReminderPostOutcome::Failed(error) => Err(AppError::slack("reminders.add", error)),
        }
    }

    fn needs_authorization(
        &self,
        user: &ActingUser,
        workspace_id: &str,
    ) -> AppResult<ReminderOutcome> {
        let prompt =
            self.authorization
                .build_reauthorization_prompt(&user.id, &user.name, workspace_id)?;
        Ok(ReminderOutcome::NeedsAuthorization(prompt))
    }
}
