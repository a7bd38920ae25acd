use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Launch feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailure(String),

    #[error("Slack {method} error: {error}")]
    SlackApi { method: String, error: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("State token error: {0}")]
    StateToken(#[from] jsonwebtoken::errors::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn slack(method: &str, error: impl Into<String>) -> Self {
        AppError::SlackApi {
            method: method.to_string(),
            error: error.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::AuthorizationFailure(msg) => {
                tracing::warn!("Authorization failure: {}", msg);
                (StatusCode::BAD_REQUEST, "AUTHORIZATION_FAILED", msg.clone())
            }
            AppError::FeedUnavailable(msg) => {
                tracing::error!("Launch feed unavailable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "FEED_UNAVAILABLE",
                    "The launch feed is unavailable".to_string(),
                )
            }
            AppError::SlackApi { method, error } => {
                tracing::error!("Slack API error: method={} error={}", method, error);
                (
                    StatusCode::BAD_GATEWAY,
                    "SLACK_API_ERROR",
                    format!("Slack {} failed", method),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::StateToken(e) => {
                tracing::error!("State token error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STATE_TOKEN_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Request(e) => {
                tracing::error!("HTTP request error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTERNAL_REQUEST_FAILED",
                    "Failed to communicate with external service".to_string(),
                )
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "Server configuration error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
