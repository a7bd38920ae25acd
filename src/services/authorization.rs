//! OAuth completion for workspace installs and personal reminder grants, and
//! the grant-access prompt that starts the personal flow.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{
    CreateUserReminderGrant, CreateWorkspaceCredential, ReminderGrantRepository,
    WorkspaceRepository,
};
use crate::error::{AppError, AppResult};
use crate::services::message::{ActionBlock, MessageAction, ResponseMessage, PROMPT_COLOR};
use crate::services::slack::{OAuthAccess, OAuthBot, SlackApi};
use crate::AppState;

pub const WELCOME_TEXT: &str = "Hello and thanks for installing me.  To enroll a channel in daily launch notifications issue the following slack command from within the desired channel: `/launch_library_subscribe 13`.  Where the number 13 is the hour of the day, in UTC, to receive notifications.";

pub const PROMPT_TITLE: &str = "Launch Library Bot needs your approval to send reminders.";

/// Identity carried through the authorize redirect as the signed `state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderGrantState {
    pub user_id: String,
    pub user_name: String,
    pub nonce: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Failure { reason: String },
    BotInstalled,
    UserGranted,
}

fn generate_nonce(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

pub struct AuthorizationCoordinator {
    pool: SqlitePool,
    slack: Arc<dyn SlackApi>,
    config: Config,
}

impl AuthorizationCoordinator {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            slack: state.slack.clone(),
            config: state.config.clone(),
        }
    }

    pub fn encode_state(&self, user_id: &str, user_name: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = ReminderGrantState {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            nonce: generate_nonce(16),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(self.config.state.ttl_minutes)).timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.state.secret.as_bytes()),
        )?)
    }

    pub fn decode_state(&self, token: &str) -> AppResult<ReminderGrantState> {
        let data = decode::<ReminderGrantState>(
            token,
            &DecodingKey::from_secret(self.config.state.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Ephemeral prompt with a single "Grant Access" button to the authorize URL.
    pub fn build_reauthorization_prompt(
        &self,
        user_id: &str,
        user_name: &str,
        workspace_id: &str,
    ) -> AppResult<ResponseMessage> {
        let state = self.encode_state(user_id, user_name)?;
        let url = format!(
            "{}?team={}&client_id={}&scope={}&state={}",
            self.config.slack.authorize_url,
            urlencoding::encode(workspace_id),
            urlencoding::encode(&self.config.slack.client_id),
            urlencoding::encode(&self.config.slack.reminder_scope),
            urlencoding::encode(&state)
        );

        Ok(ResponseMessage::default()
            .ephemeral()
            .keep_original()
            .with_attachment(ActionBlock {
                title: Some(PROMPT_TITLE.to_string()),
                fallback: Some(PROMPT_TITLE.to_string()),
                color: Some(PROMPT_COLOR.to_string()),
                actions: vec![MessageAction::Link {
                    text: "Grant Access".to_string(),
                    fallback: Some("Grant Access".to_string()),
                    url,
                }],
                ..Default::default()
            }))
    }

    /// Exchange `code` and persist whichever credential it yields. Rejections
    /// become [`AuthorizationOutcome::Failure`]; storage errors are returned.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> AppResult<AuthorizationOutcome> {
        match self.authorize(code, state).await {
            Err(AppError::AuthorizationFailure(reason)) => {
                tracing::warn!("Authorization failed: {}", reason);
                Ok(AuthorizationOutcome::Failure { reason })
            }
            other => other,
        }
    }

    async fn authorize(&self, code: &str, state: Option<&str>) -> AppResult<AuthorizationOutcome> {
        let access = self
            .slack
            .exchange_code(code)
            .await
            .map_err(|e| AppError::AuthorizationFailure(e.to_string()))?;

        if !access.ok {
            return Err(AppError::AuthorizationFailure(
                access.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        match access.bot.clone() {
            Some(bot) => self.install_workspace(access, bot).await,
            None => self.grant_reminders(access, state).await,
        }
    }

    async fn install_workspace(
        &self,
        access: OAuthAccess,
        bot: OAuthBot,
    ) -> AppResult<AuthorizationOutcome> {
        let (Some(workspace_id), Some(installing_user_id), Some(workspace_access_token)) =
            (access.team_id, access.user_id, access.access_token)
        else {
            return Err(AppError::AuthorizationFailure(
                "oauth.access response is missing install fields".to_string(),
            ));
        };

        let workspace = WorkspaceRepository::upsert(
            &self.pool,
            CreateWorkspaceCredential {
                workspace_id,
                workspace_name: access.team_name.unwrap_or_default(),
                installing_user_id,
                bot_user_id: bot.bot_user_id,
                bot_access_token: bot.bot_access_token,
                workspace_access_token,
            },
        )
        .await?;
        tracing::info!(
            "Bot installed in workspace {} ({})",
            workspace.workspace_id,
            workspace.workspace_name
        );

        if let Err(e) = self
            .slack
            .post_message(
                &workspace.bot_access_token,
                &workspace.installing_user_id,
                &ResponseMessage::text(WELCOME_TEXT),
            )
            .await
        {
            tracing::warn!(
                "Failed to send welcome message to {}: {}",
                workspace.installing_user_id,
                e
            );
        }

        Ok(AuthorizationOutcome::BotInstalled)
    }

    async fn grant_reminders(
        &self,
        access: OAuthAccess,
        state: Option<&str>,
    ) -> AppResult<AuthorizationOutcome> {
        let token = state
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::AuthorizationFailure("missing_state".to_string()))?;
        let claims = self.decode_state(token).map_err(|e| {
            tracing::debug!("State token rejected: {}", e);
            AppError::AuthorizationFailure("invalid_state".to_string())
        })?;

        let (Some(workspace_id), Some(personal_access_token)) = (access.team_id, access.access_token)
        else {
            return Err(AppError::AuthorizationFailure(
                "oauth.access response is missing grant fields".to_string(),
            ));
        };

        ReminderGrantRepository::upsert(
            &self.pool,
            CreateUserReminderGrant {
                user_id: claims.user_id.clone(),
                user_name: claims.user_name,
                workspace_id,
                personal_access_token,
            },
        )
        .await?;
        tracing::info!("Reminder access granted by user {}", claims.user_id);

        Ok(AuthorizationOutcome::UserGranted)
    }
}
