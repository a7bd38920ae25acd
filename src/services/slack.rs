//! Slack Web API client and wire rendering for [`AnnouncementMessage`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SlackConfig;
use crate::error::{AppError, AppResult};
use crate::services::message::{AnnouncementMessage, MessageAction};

/// `reminders.add` errors meaning the personal token is no longer usable.
const REVOKED_ERRORS: [&str; 3] = ["token_revoked", "invalid_auth", "account_inactive"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderPostOutcome {
    Ok,
    /// The personal token was revoked or deactivated.
    Revoked(String),
    Failed(String),
}

pub fn classify_reminder_error(error: &str) -> ReminderPostOutcome {
    if REVOKED_ERRORS.contains(&error) {
        ReminderPostOutcome::Revoked(error.to_string())
    } else {
        ReminderPostOutcome::Failed(error.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthBot {
    pub bot_user_id: String,
    pub bot_access_token: String,
}

/// Response of `oauth.access`. `bot` is only present for workspace installs.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAccess {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub bot: Option<OAuthBot>,
}

#[async_trait]
pub trait SlackApi: Send + Sync + 'static {
    async fn post_message(
        &self,
        bot_token: &str,
        channel: &str,
        message: &AnnouncementMessage,
    ) -> AppResult<()>;

    async fn add_reminder(
        &self,
        personal_token: &str,
        text: &str,
        fire_time: DateTime<Utc>,
    ) -> AppResult<ReminderPostOutcome>;

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthAccess>;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SlackAttachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_original: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfurl_links: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfurl_media: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SlackAction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlackAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub action_type: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&MessageAction> for SlackAction {
    fn from(action: &MessageAction) -> Self {
        match action {
            MessageAction::Callback { name, text, value } => SlackAction {
                name: Some(name.clone()),
                action_type: "button",
                text: text.clone(),
                value: Some(value.clone()),
                fallback: None,
                url: None,
            },
            MessageAction::Link {
                text,
                fallback,
                url,
            } => SlackAction {
                name: None,
                action_type: "button",
                text: text.clone(),
                value: None,
                fallback: fallback.clone(),
                url: Some(url.clone()),
            },
        }
    }
}

/// Render a message in Slack's legacy attachment format. Images become a
/// trailing `:rocket:` link paragraph so Slack unfurls them.
pub fn render_message(message: &AnnouncementMessage) -> SlackMessage {
    let mut text = message.text.clone();
    for image in &message.images {
        text.push_str(&format!("\n<{}|:rocket:>\n", image));
    }

    SlackMessage {
        text,
        attachments: message
            .attachment
            .iter()
            .map(|block| SlackAttachment {
                color: block.color.clone(),
                fallback: block.fallback.clone(),
                callback_id: block.callback_id.clone(),
                title: block.title.clone(),
                text: block.text.clone(),
                actions: block.actions.iter().map(SlackAction::from).collect(),
            })
            .collect(),
        response_type: message.ephemeral.then(|| "ephemeral".to_string()),
        replace_original: message.replace_original,
        ..Default::default()
    }
}

#[derive(Debug, Deserialize)]
struct SlackEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReminderRequest<'a> {
    text: &'a str,
    time: i64,
}

#[derive(Clone)]
pub struct SlackService {
    client: reqwest::Client,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl SlackService {
    pub fn new(config: &SlackConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create Slack HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    async fn read_envelope(method: &str, response: reqwest::Response) -> AppResult<SlackEnvelope> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::slack(
                method,
                format!("HTTP {}: {}", status, error_text),
            ));
        }
        response
            .json::<SlackEnvelope>()
            .await
            .map_err(|e| AppError::slack(method, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl SlackApi for SlackService {
    async fn post_message(
        &self,
        bot_token: &str,
        channel: &str,
        message: &AnnouncementMessage,
    ) -> AppResult<()> {
        let mut payload = render_message(message);
        payload.channel = Some(channel.to_string());
        payload.unfurl_links = Some(false);
        payload.unfurl_media = Some(true);

        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(bot_token)
            .json(&payload)
            .send()
            .await?;

        let envelope = Self::read_envelope("chat.postMessage", response).await?;
        if !envelope.ok {
            return Err(AppError::slack(
                "chat.postMessage",
                envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        tracing::debug!("Slack message posted to {}", channel);
        Ok(())
    }

    async fn add_reminder(
        &self,
        personal_token: &str,
        text: &str,
        fire_time: DateTime<Utc>,
    ) -> AppResult<ReminderPostOutcome> {
        let response = self
            .client
            .post(self.method_url("reminders.add"))
            .bearer_auth(personal_token)
            .json(&ReminderRequest {
                text,
                time: fire_time.timestamp(),
            })
            .send()
            .await?;

        let envelope = Self::read_envelope("reminders.add", response).await?;
        if envelope.ok {
            return Ok(ReminderPostOutcome::Ok);
        }
        Ok(classify_reminder_error(
            envelope.error.as_deref().unwrap_or("unknown_error"),
        ))
    }

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthAccess> {
        let response = self
            .client
            .get(self.method_url("oauth.access"))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AppError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::slack(
                "oauth.access",
                format!("HTTP {}: {}", status, error_text),
            ));
        }

        response
            .json::<OAuthAccess>()
            .await
            .map_err(|e| {
                AppError::slack(
                    "oauth.access",
                    format!("Failed to parse response: {}", e.without_url()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::message::{ActionBlock, PROMPT_COLOR};
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use serde_json::json;

    fn service(server: &MockServer) -> SlackService {
        service_at(&server.base_url())
    }

    fn service_at(api_url: &str) -> SlackService {
        SlackService::new(&SlackConfig {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            verification_token: "vtoken".to_string(),
            signing_secret: None,
            api_url: api_url.to_string(),
            authorize_url: "https://slack.com/oauth/authorize".to_string(),
            reminder_scope: "reminders:write".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn empty_message_renders_as_empty_object() {
        let rendered = serde_json::to_value(render_message(&AnnouncementMessage::empty())).unwrap();
        assert_eq!(rendered, json!({}));
    }

    #[test]
    fn renders_ephemeral_prompt_with_link_action() {
        let msg = AnnouncementMessage::default()
            .ephemeral()
            .keep_original()
            .with_attachment(ActionBlock {
                title: Some("Approve".to_string()),
                fallback: Some("Approve".to_string()),
                color: Some(PROMPT_COLOR.to_string()),
                actions: vec![MessageAction::Link {
                    text: "Grant Access".to_string(),
                    fallback: Some("Grant Access".to_string()),
                    url: "https://auth".to_string(),
                }],
                ..Default::default()
            });

        assert_eq!(
            serde_json::to_value(render_message(&msg)).unwrap(),
            json!({
                "response_type": "ephemeral",
                "replace_original": false,
                "attachments": [{
                    "color": "#800000",
                    "fallback": "Approve",
                    "title": "Approve",
                    "actions": [{
                        "type": "button",
                        "text": "Grant Access",
                        "fallback": "Grant Access",
                        "url": "https://auth"
                    }]
                }]
            })
        );
    }

    #[test]
    fn images_are_appended_as_rocket_links() {
        let mut msg = AnnouncementMessage::text("*Atlas V*\n");
        msg.images.push("https://img/atlas_480.png".to_string());
        assert_eq!(
            render_message(&msg).text,
            "*Atlas V*\n\n<https://img/atlas_480.png|:rocket:>\n"
        );
    }

    #[test]
    fn revocation_errors_are_classified() {
        for error in ["token_revoked", "invalid_auth", "account_inactive"] {
            assert_eq!(
                classify_reminder_error(error),
                ReminderPostOutcome::Revoked(error.to_string())
            );
        }
        assert_eq!(
            classify_reminder_error("time_in_past"),
            ReminderPostOutcome::Failed("time_in_past".to_string())
        );
    }

    #[tokio::test]
    async fn post_message_sends_bearer_token_and_unfurl_flags() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("authorization", "Bearer xoxb-bot")
                .body_includes("\"channel\":\"C1\"")
                .body_includes("\"unfurl_links\":false")
                .body_includes("\"unfurl_media\":true");
            then.status(200).json_body(json!({"ok": true, "ts": "1.1"}));
        });

        service(&server)
            .post_message("xoxb-bot", "C1", &AnnouncementMessage::text("hello"))
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn post_message_not_ok_is_slack_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat.postMessage");
            then.status(200)
                .json_body(json!({"ok": false, "error": "channel_not_found"}));
        });

        let err = service(&server)
            .post_message("xoxb-bot", "C404", &AnnouncementMessage::text("hello"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::SlackApi { ref method, ref error } if method == "chat.postMessage" && error == "channel_not_found")
        );
    }

    #[tokio::test]
    async fn add_reminder_reports_revocation() {
        let server = MockServer::start();
        let fire = Utc.with_ymd_and_hms(2021, 3, 4, 13, 55, 0).unwrap();
        server.mock(|when, then| {
            when.method(POST)
                .path("/reminders.add")
                .header("authorization", "Bearer xoxp-user")
                .json_body(json!({"text": "soon", "time": fire.timestamp()}));
            then.status(200)
                .json_body(json!({"ok": false, "error": "invalid_auth"}));
        });

        let outcome = service(&server)
            .add_reminder("xoxp-user", "soon", fire)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReminderPostOutcome::Revoked("invalid_auth".to_string())
        );
    }

    #[tokio::test]
    async fn exchange_code_parses_bot_install() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/oauth.access")
                .query_param("client_id", "cid")
                .query_param("client_secret", "csecret")
                .query_param("code", "abc");
            then.status(200).json_body(json!({
                "ok": true,
                "access_token": "xoxp-install",
                "team_id": "T1",
                "team_name": "Rockets",
                "user_id": "U1",
                "bot": {"bot_user_id": "B1", "bot_access_token": "xoxb-new"}
            }));
        });

        let access = service(&server).exchange_code("abc").await.unwrap();
        assert!(access.ok);
        assert_eq!(access.team_id.as_deref(), Some("T1"));
        assert_eq!(access.bot.unwrap().bot_access_token, "xoxb-new");
    }

    #[tokio::test]
    async fn exchange_code_transport_error_hides_client_secret() {
        // Nothing listens on the discard port.
        let err = service_at("http://127.0.0.1:9")
            .exchange_code("abc")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Request(_)));
        assert!(!err.to_string().contains("csecret"));
    }

    #[tokio::test]
    async fn exchange_code_decode_error_hides_client_secret() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/oauth.access");
            then.status(200).body("<html>not json</html>");
        });

        let err = service(&server).exchange_code("abc").await.unwrap_err();

        assert!(matches!(err, AppError::SlackApi { .. }));
        assert!(!err.to_string().contains("csecret"));
    }
}
