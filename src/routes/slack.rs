//! The single Slack endpoint: OAuth redirects arrive as `GET /slack?code=..`,
//! slash commands and interactive actions as form-encoded `POST /slack`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::routes::pages;
use crate::services::authorization::AuthorizationCoordinator;
use crate::services::commands::{CommandService, SlashCommand};
use crate::services::message::ResponseMessage;
use crate::services::reminders::{ActingUser, ReminderService};
use crate::services::signature::verify_signature;
use crate::services::slack::{render_message, SlackMessage};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/slack", get(handle_oauth_redirect).post(handle_slack_request))
}

#[derive(Debug, Deserialize)]
struct OAuthRedirectQuery {
    code: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PayloadTeam {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PayloadUser {
    id: String,
    #[serde(default)]
    name: String,
}

/// The parts of an interactive action payload the reminder flow needs.
#[derive(Debug, Deserialize)]
struct InteractivePayload {
    #[serde(default)]
    token: String,
    callback_id: String,
    team: PayloadTeam,
    user: PayloadUser,
}

async fn handle_oauth_redirect(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OAuthRedirectQuery>,
) -> AppResult<Response> {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return Ok(Json(SlackMessage::default()).into_response());
    };

    let outcome = AuthorizationCoordinator::new(&state)
        .complete_authorization(&code, query.state.as_deref())
        .await?;
    tracing::info!("OAuth redirect completed: {:?}", outcome);

    Ok(Html(pages::render(&outcome)).into_response())
}

async fn handle_slack_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<SlackMessage>> {
    if let Some(secret) = &state.config.slack.signing_secret {
        verify_signature(secret, &headers, &body, chrono::Utc::now())?;
    }

    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();

    let response = if let Some(raw) = form.get("payload") {
        let payload: InteractivePayload = serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("Invalid payload: {}", e)))?;

        ReminderService::new(&state)
            .request_reminder(
                &payload.callback_id,
                &ActingUser {
                    id: payload.user.id,
                    name: payload.user.name,
                },
                &payload.team.id,
                &payload.token,
            )
            .await?
            .into_response()
    } else if form.contains_key("command") {
        let fields = form
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        let command: SlashCommand = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::BadRequest(format!("Invalid command: {}", e)))?;

        CommandService::new(&state).handle(command).await?
    } else {
        ResponseMessage::empty()
    };

    Ok(Json(render_message(&response)))
}
