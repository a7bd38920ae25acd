//! Slash commands that enroll and withdraw channels.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db::{ChannelSubscriptionRepository, CreateChannelSubscription};
use crate::error::AppResult;
use crate::services::message::{
    ActionBlock, ResponseMessage, ERROR_COLOR, VERIFICATION_ERROR_TEXT,
};
use crate::AppState;

pub const SUBSCRIBE_COMMAND: &str = "/launch_library_subscribe";
pub const UNSUBSCRIBE_COMMAND: &str = "/launch_library_unsubscribe";

const MISSING_HOUR_TEXT: &str = "Please specify one argument to the /launch_library_subscribe command.  Example: /launch_library_subscribe 13";
const HOUR_RANGE_TEXT: &str = "The time of day argument must be an hour between 0 and 23";

/// Form fields Slack sends with a slash command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub token: String,
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub team_domain: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourArgument {
    Missing,
    OutOfRange,
    Hour(u32),
}

/// First word of the command text as a UTC hour. `H:MM` keeps `H`; trailing
/// non-digits after the leading number are ignored.
pub fn parse_hour(text: &str) -> HourArgument {
    let Some(word) = text.split_whitespace().next() else {
        return HourArgument::Missing;
    };
    let hour_part = word.split(':').next().unwrap_or_default();

    let (negative, unsigned) = match hour_part.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, hour_part.strip_prefix('+').unwrap_or(hour_part)),
    };
    let digits: String = unsigned.chars().take_while(|c| c.is_ascii_digit()).collect();

    match digits.parse::<u32>() {
        Ok(hour) if !negative && hour < 24 => HourArgument::Hour(hour),
        _ => HourArgument::OutOfRange,
    }
}

fn usage_error(text: &str) -> ResponseMessage {
    ResponseMessage::default().with_attachment(ActionBlock {
        text: Some(text.to_string()),
        color: Some(ERROR_COLOR.to_string()),
        ..Default::default()
    })
}

pub struct CommandService {
    pool: SqlitePool,
    verification_token: String,
}

impl CommandService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            verification_token: state.config.slack.verification_token.clone(),
        }
    }

    pub async fn handle(&self, command: SlashCommand) -> AppResult<ResponseMessage> {
        if command.token != self.verification_token {
            tracing::warn!(
                "Slash command {} from {} failed verification",
                command.command,
                command.user_id
            );
            return Ok(ResponseMessage::failure(VERIFICATION_ERROR_TEXT));
        }

        match command.command.as_str() {
            SUBSCRIBE_COMMAND => self.subscribe(command).await,
            UNSUBSCRIBE_COMMAND => self.unsubscribe(command).await,
            other => {
                tracing::debug!("Ignoring unknown slash command {}", other);
                Ok(ResponseMessage::empty())
            }
        }
    }

    async fn subscribe(&self, command: SlashCommand) -> AppResult<ResponseMessage> {
        let hour = match parse_hour(&command.text) {
            HourArgument::Hour(hour) => hour,
            HourArgument::Missing => return Ok(usage_error(MISSING_HOUR_TEXT)),
            HourArgument::OutOfRange => return Ok(usage_error(HOUR_RANGE_TEXT)),
        };

        let subscription = ChannelSubscriptionRepository::upsert(
            &self.pool,
            CreateChannelSubscription {
                channel_id: command.channel_id,
                channel_name: command.channel_name,
                workspace_id: command.team_id,
                workspace_domain: command.team_domain,
                subscribing_user_id: command.user_id,
                subscribing_user_name: command.user_name,
                hour_of_day: hour,
            },
        )
        .await?;
        tracing::info!(
            "Channel {} subscribed at {}:00 UTC",
            subscription.channel_id,
            hour
        );

        Ok(ResponseMessage::text(format!(
            "Launch Library Bot successfully enrolled on channel {} for notification at {}:00 UTC",
            subscription.channel_name, hour
        )))
    }

    async fn unsubscribe(&self, command: SlashCommand) -> AppResult<ResponseMessage> {
        ChannelSubscriptionRepository::delete(&self.pool, &command.channel_id).await?;
        tracing::info!("Channel {} unsubscribed", command.channel_id);

        Ok(ResponseMessage::text(format!(
            "Launch Library Bot successfully withdrew channel {} from notifications",
            command.channel_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{test_state, FakeFeed, FakeSlack, VERIFICATION_TOKEN};

    fn command(name: &str, text: &str) -> SlashCommand {
        SlashCommand {
            token: VERIFICATION_TOKEN.to_string(),
            command: name.to_string(),
            text: text.to_string(),
            channel_id: "C1".to_string(),
            channel_name: "launches".to_string(),
            team_id: "T1".to_string(),
            team_domain: "rockets".to_string(),
            user_id: "U1".to_string(),
            user_name: "ada".to_string(),
        }
    }

    async fn service() -> (Arc<AppState>, CommandService) {
        let state = test_state(
            Arc::new(FakeFeed::default()),
            Arc::new(FakeSlack::default()),
        )
        .await;
        let service = CommandService::new(&state);
        (state, service)
    }

    #[test]
    fn parses_hour_forms() {
        assert_eq!(parse_hour("13"), HourArgument::Hour(13));
        assert_eq!(parse_hour("  7:45 please"), HourArgument::Hour(7));
        assert_eq!(parse_hour("0"), HourArgument::Hour(0));
        assert_eq!(parse_hour("23"), HourArgument::Hour(23));
        assert_eq!(parse_hour("24"), HourArgument::OutOfRange);
        assert_eq!(parse_hour("-3"), HourArgument::OutOfRange);
        assert_eq!(parse_hour("noon"), HourArgument::OutOfRange);
        assert_eq!(parse_hour(""), HourArgument::Missing);
        assert_eq!(parse_hour("   "), HourArgument::Missing);
    }

    #[tokio::test]
    async fn subscribe_twice_keeps_latest_hour() {
        let (state, service) = service().await;

        service.handle(command(SUBSCRIBE_COMMAND, "13")).await.unwrap();
        let reply = service
            .handle(command(SUBSCRIBE_COMMAND, "9:30"))
            .await
            .unwrap();

        assert_eq!(
            reply.text,
            "Launch Library Bot successfully enrolled on channel launches for notification at 9:00 UTC"
        );
        let stored = ChannelSubscriptionRepository::find_by_channel_id(&state.db, "C1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.hour_of_day, 9);
    }

    #[tokio::test]
    async fn bad_hours_are_reported_without_storing() {
        let (state, service) = service().await;

        let missing = service.handle(command(SUBSCRIBE_COMMAND, "")).await.unwrap();
        let block = missing.attachment.unwrap();
        assert_eq!(block.text.as_deref(), Some(MISSING_HOUR_TEXT));
        assert_eq!(block.color.as_deref(), Some(ERROR_COLOR));

        let range = service.handle(command(SUBSCRIBE_COMMAND, "25")).await.unwrap();
        assert_eq!(range.attachment.unwrap().text.as_deref(), Some(HOUR_RANGE_TEXT));

        assert!(ChannelSubscriptionRepository::find_by_channel_id(&state.db, "C1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unsubscribe_unknown_channel_succeeds() {
        let (_state, service) = service().await;
        let reply = service
            .handle(command(UNSUBSCRIBE_COMMAND, ""))
            .await
            .unwrap();
        assert_eq!(
            reply.text,
            "Launch Library Bot successfully withdrew channel launches from notifications"
        );
    }

    #[tokio::test]
    async fn wrong_token_and_unknown_commands() {
        let (state, service) = service().await;

        let mut forged = command(SUBSCRIBE_COMMAND, "13");
        forged.token = "nope".to_string();
        let reply = service.handle(forged).await.unwrap();
        assert_eq!(reply, ResponseMessage::failure(VERIFICATION_ERROR_TEXT));
        assert!(ChannelSubscriptionRepository::find_by_channel_id(&state.db, "C1")
            .await
            .unwrap()
            .is_none());

        let unknown = service.handle(command("/launch_library_weather", "")).await.unwrap();
        assert!(unknown.is_empty());
    }
}
