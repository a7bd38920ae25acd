//! Initialization helpers for the application:
//! - database connection + migrations
//! - the hourly announcement worker
//!
//! Keeps `main.rs` down to wiring.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, DurationRound, Utc};
use tracing::Instrument;

use crate::config::Config;
use crate::services::announcements::AnnouncementService;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password) components.
/// Falls back to removing everything before '@' or returning "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        format!("{}://{}{}{}", url.scheme(), host, port_part, url.path())
    } else if let Some(at_pos) = db_url.find('@') {
        format!("(redacted){}", &db_url[at_pos + 1..])
    } else {
        "(redacted)".to_string()
    }
}

/// Open the SQLite pool and run migrations, creating the database directory
/// and file on first start.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// The next top of the UTC hour strictly after `now`.
pub fn next_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = chrono::Duration::hours(1);
    now.duration_trunc(hour)
        .map(|top| top + hour)
        .unwrap_or(now + hour)
}

/// Run one announcement tick under its own run id.
pub async fn run_tick_once(state: &Arc<crate::AppState>, now: DateTime<Utc>) {
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("tick", %run_id, hour = %now.format("%H:00"));

    async {
        match AnnouncementService::new(state).run_tick(now).await {
            Ok(report) => tracing::info!(
                "Tick complete: {} channels, {} announcements, {} failed channels",
                report.channels,
                report.announced,
                report.errors.len()
            ),
            Err(e) => tracing::error!("Tick aborted: {}", e),
        }
    }
    .instrument(span)
    .await
}

/// Spawn background workers. Currently a single task that runs the
/// announcement tick at the top of every UTC hour.
///
/// Returns the `JoinHandle`s so callers can await shutdown. Workers exit when
/// the `shutdown` broadcast fires.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    if !state.config.notifications.tick_enabled {
        tracing::info!("Announcement worker disabled (TICK_ENABLED=false)");
        return handles;
    }

    let mut shutdown_rx = shutdown.subscribe();
    handles.push(tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let tick_at = next_hour(now);
            let wait = (tick_at - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(3600));
            tracing::debug!("Next announcement tick at {}", tick_at);

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Announcement worker shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            run_tick_once(&state, tick_at).await;
        }
    }));

    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact_db_url("postgres://user:pw@db:5432/app"),
            "postgres://db:5432/app"
        );
        assert_eq!(
            redact_db_url("sqlite://data/launch_library.db"),
            "sqlite://data/launch_library.db"
        );
    }

    #[test]
    fn ticks_at_top_of_next_hour() {
        let now = Utc.with_ymd_and_hms(2020, 11, 19, 12, 59, 30).unwrap();
        let top = Utc.with_ymd_and_hms(2020, 11, 19, 13, 0, 0).unwrap();
        assert_eq!(next_hour(now), top);
        assert_eq!(
            next_hour(top),
            Utc.with_ymd_and_hms(2020, 11, 19, 14, 0, 0).unwrap()
        );
    }
}
