//! Slack request signing (`X-Slack-Signature`).

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub const SLACK_TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SLACK_SIGNATURE_HEADER: &str = "x-slack-signature";

/// Requests older than this are rejected as replays.
const MAX_AGE_SECONDS: u64 = 60 * 5;

fn header(headers: &HeaderMap, name: &str) -> AppResult<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or(AppError::Unauthorized)
}

fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> AppResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to create HMAC")))?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

/// `v0=` + hex HMAC-SHA256 of `v0:{timestamp}:{body}`.
#[cfg(test)]
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> AppResult<String> {
    let mac = mac_for(secret, timestamp, body)?;
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Verify the signature headers against the raw body.
pub fn verify_signature(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now: DateTime<Utc>,
) -> AppResult<()> {
    let timestamp = header(headers, SLACK_TIMESTAMP_HEADER)?;
    let signature = header(headers, SLACK_SIGNATURE_HEADER)?;

    let sent_at: i64 = timestamp.parse().map_err(|_| AppError::Unauthorized)?;
    if now.timestamp().abs_diff(sent_at) > MAX_AGE_SECONDS {
        tracing::warn!("Slack request timestamp outside the allowed window");
        return Err(AppError::Unauthorized);
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(AppError::Unauthorized)?;

    mac_for(secret, &timestamp, body)?
        .verify_slice(&expected)
        .map_err(|_| AppError::Unauthorized)
}
