//! Launch feed client.
//!
//! Upstream feeds change shape between schema versions. Each schema gets its own
//! adapter that normalizes into [`LaunchEvent`]; everything downstream only ever
//! sees the canonical model. The adapter is picked once from configuration by
//! [`build_feed`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::{FeedConfig, FeedSchema};
use crate::error::{AppError, AppResult};

pub mod legacy;
pub mod spacedevs;

pub use legacy::LegacyFeedClient;
pub use spacedevs::SpaceDevsFeedClient;

/// Prefix marking a button id as a generic event rather than a launch.
pub const EVENT_ID_PREFIX: &str = "event-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Launch,
    Event,
}

/// Textual reference to a feed item, as carried by the "Remind Me" button.
/// Launches use the bare feed id, events are prefixed with `event-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRef {
    pub kind: EventKind,
    pub id: String,
}

impl EventRef {
    pub fn launch(id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Launch,
            id: id.into(),
        }
    }

    pub fn event(id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Event,
            id: id.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(EVENT_ID_PREFIX) {
            Some(id) => Self::event(id),
            None => Self::launch(raw),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Launch => write!(f, "{}", self.id),
            EventKind::Event => write!(f, "{}{}", EVENT_ID_PREFIX, self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Rocket,
    Mission,
    MoreInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLink {
    pub kind: ReferenceKind,
    pub url: String,
}

impl ReferenceLink {
    pub fn new(kind: ReferenceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// Raw image descriptor; the size variant is picked by the composer.
/// Empty `size_variants` means `base_url` is only served at one size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidateSet {
    pub base_url: String,
    pub size_variants: Vec<String>,
}

/// Canonical launch or event, independent of the feed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchEvent {
    pub id: String,
    pub kind: EventKind,
    pub name: String,
    pub window_start: DateTime<Utc>,
    pub window_end: Option<DateTime<Utc>>,
    pub is_tbd: bool,
    pub net_time: Option<DateTime<Utc>>,
    /// Percentage; `-1` is the feed's "unknown" sentinel.
    pub weather_go_probability: Option<i32>,
    pub pad_name: Option<String>,
    pub pad_wiki_url: Option<String>,
    pub pad_map_url: Option<String>,
    pub description_lines: Vec<String>,
    pub reference_links: Vec<ReferenceLink>,
    pub video_links: Vec<String>,
    pub image_candidate: Option<ImageCandidateSet>,
}

impl LaunchEvent {
    /// A bare event with only the required fields set.
    pub fn new(
        kind: EventKind,
        id: impl Into<String>,
        name: impl Into<String>,
        window_start: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            window_start,
            window_end: None,
            is_tbd: false,
            net_time: None,
            weather_go_probability: None,
            pad_name: None,
            pad_wiki_url: None,
            pad_map_url: None,
            description_lines: Vec::new(),
            reference_links: Vec::new(),
            video_links: Vec::new(),
            image_candidate: None,
        }
    }

    pub fn reference(&self) -> EventRef {
        EventRef {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

#[async_trait]
pub trait LaunchFeed: Send + Sync + 'static {
    /// A bounded window of upcoming items. Items without a window start are
    /// dropped rather than reported.
    async fn fetch_upcoming(&self) -> AppResult<Vec<LaunchEvent>>;

    /// A single item by reference.
    async fn fetch_event(&self, event: &EventRef) -> AppResult<LaunchEvent>;
}

/// Build the feed client for the configured schema.
pub fn build_feed(config: &FeedConfig) -> AppResult<Arc<dyn LaunchFeed>> {
    let client = http_client(config)?;
    let feed: Arc<dyn LaunchFeed> = match config.schema {
        FeedSchema::Legacy => Arc::new(LegacyFeedClient::new(
            client,
            &config.legacy_url,
            config.upcoming_limit,
        )),
        FeedSchema::SpaceDevs => Arc::new(SpaceDevsFeedClient::new(
            client,
            &config.spacedevs_url,
            config.upcoming_limit,
        )),
    };
    tracing::info!("Launch feed client configured for {:?} schema", config.schema);
    Ok(feed)
}

pub(crate) fn http_client(config: &FeedConfig) -> AppResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent)
            .map_err(|_| AppError::Config("FEED_USER_AGENT is not a valid header".to_string()))?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
        .build()
        .map_err(|e| AppError::FeedUnavailable(format!("Failed to create HTTP client: {}", e)))
}

/// GET a feed resource and decode it. Every failure is `FeedUnavailable`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> AppResult<T> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| AppError::FeedUnavailable(format!("GET {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::FeedUnavailable(format!(
            "GET {} returned {}: {}",
            url, status, error_text
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::FeedUnavailable(format!("Failed to parse {}: {}", url, e)))
}

/// Feeds use empty strings for missing links.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
