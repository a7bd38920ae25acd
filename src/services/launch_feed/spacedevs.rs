//! Adapter for the ll.thespacedevs.com 2.0 schema. Upcoming launches and
//! upcoming events come from separate endpoints and are merged by window start.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{
    get_json, non_empty, EventKind, EventRef, ImageCandidateSet, LaunchEvent, LaunchFeed,
    ReferenceKind, ReferenceLink,
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SpaceDevsLaunch {
    id: Value,
    name: String,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
    net: Option<DateTime<Utc>>,
    #[serde(default)]
    tbdtime: Option<bool>,
    probability: Option<i32>,
    pad: Option<SpaceDevsPad>,
    rocket: Option<SpaceDevsRocket>,
    mission: Option<SpaceDevsMission>,
    #[serde(rename = "vidURLs", default)]
    vid_urls: Option<Vec<SpaceDevsUrl>>,
    #[serde(rename = "infoURLs", default)]
    info_urls: Option<Vec<SpaceDevsUrl>>,
}

#[derive(Debug, Deserialize)]
struct SpaceDevsPad {
    name: Option<String>,
    wiki_url: Option<String>,
    map_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpaceDevsRocket {
    configuration: Option<SpaceDevsRocketConfiguration>,
}

#[derive(Debug, Deserialize)]
struct SpaceDevsRocketConfiguration {
    wiki_url: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpaceDevsMission {
    description: Option<String>,
    wiki_url: Option<String>,
}

/// 2.0 returns link objects in some places and bare strings in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpaceDevsUrl {
    Object { url: Option<String> },
    Plain(String),
}

impl SpaceDevsUrl {
    fn into_url(self) -> Option<String> {
        match self {
            SpaceDevsUrl::Object { url } => non_empty(url),
            SpaceDevsUrl::Plain(url) => non_empty(Some(url)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpaceDevsEvent {
    id: Value,
    name: String,
    date: Option<DateTime<Utc>>,
    description: Option<String>,
    video_url: Option<String>,
    news_url: Option<String>,
    feature_image: Option<String>,
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SpaceDevsLaunch {
    fn normalize(self) -> Option<LaunchEvent> {
        let id = id_string(&self.id)?;
        let Some(window_start) = self.window_start else {
            tracing::debug!("Dropping launch {} without a window start", id);
            return None;
        };

        let mut event = LaunchEvent::new(EventKind::Launch, id, self.name, window_start);
        event.window_end = self.window_end;
        event.net_time = self.net;
        event.is_tbd = self.tbdtime.unwrap_or(false);
        event.weather_go_probability = self.probability;

        if let Some(config) = self.rocket.and_then(|r| r.configuration) {
            if let Some(wiki) = non_empty(config.wiki_url) {
                event
                    .reference_links
                    .push(ReferenceLink::new(ReferenceKind::Rocket, wiki));
            }
            // Single-size URL, used as-is.
            if let Some(base_url) = non_empty(config.image_url) {
                event.image_candidate = Some(ImageCandidateSet {
                    base_url,
                    size_variants: Vec::new(),
                });
            }
        }

        if let Some(mission) = self.mission {
            if let Some(wiki) = non_empty(mission.wiki_url) {
                event
                    .reference_links
                    .push(ReferenceLink::new(ReferenceKind::Mission, wiki));
            }
            if let Some(description) = non_empty(mission.description) {
                event.description_lines.push(description);
            }
        }

        for info in self.info_urls.unwrap_or_default() {
            if let Some(url) = info.into_url() {
                event
                    .reference_links
                    .push(ReferenceLink::new(ReferenceKind::MoreInfo, url));
            }
        }

        if let Some(pad) = self.pad {
            event.pad_name = non_empty(pad.name);
            event.pad_wiki_url = non_empty(pad.wiki_url);
            event.pad_map_url = non_empty(pad.map_url);
        }

        event.video_links = self
            .vid_urls
            .unwrap_or_default()
            .into_iter()
            .filter_map(SpaceDevsUrl::into_url)
            .collect();

        Some(event)
    }
}

impl SpaceDevsEvent {
    fn normalize(self) -> Option<LaunchEvent> {
        let id = id_string(&self.id)?;
        let Some(date) = self.date else {
            tracing::debug!("Dropping event {} without a date", id);
            return None;
        };

        let mut event = LaunchEvent::new(EventKind::Event, id, self.name, date);
        event.net_time = Some(date);
        if let Some(description) = non_empty(self.description) {
            event.description_lines.push(description);
        }
        if let Some(news) = non_empty(self.news_url) {
            event
                .reference_links
                .push(ReferenceLink::new(ReferenceKind::MoreInfo, news));
        }
        if let Some(video) = non_empty(self.video_url) {
            event.video_links.push(video);
        }
        if let Some(base_url) = non_empty(self.feature_image) {
            event.image_candidate = Some(ImageCandidateSet {
                base_url,
                size_variants: Vec::new(),
            });
        }
        Some(event)
    }
}

pub struct SpaceDevsFeedClient {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl SpaceDevsFeedClient {
    pub fn new(client: reqwest::Client, base_url: &str, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }
}

#[async_trait]
impl LaunchFeed for SpaceDevsFeedClient {
    async fn fetch_upcoming(&self) -> AppResult<Vec<LaunchEvent>> {
        let launches: Paginated<SpaceDevsLaunch> = get_json(
            &self.client,
            &format!("{}/launch/upcoming/", self.base_url),
            &[
                ("limit", self.limit.to_string()),
                ("mode", "detailed".to_string()),
            ],
        )
        .await?;
        let events: Paginated<SpaceDevsEvent> = get_json(
            &self.client,
            &format!("{}/event/upcoming/", self.base_url),
            &[("limit", self.limit.to_string())],
        )
        .await?;

        let mut upcoming: Vec<LaunchEvent> = launches
            .results
            .into_iter()
            .filter_map(SpaceDevsLaunch::normalize)
            .chain(events.results.into_iter().filter_map(SpaceDevsEvent::normalize))
            .collect();
        // Stable sort keeps feed order for identical window starts.
        upcoming.sort_by_key(|e| e.window_start);
        Ok(upcoming)
    }

    async fn fetch_event(&self, event: &EventRef) -> AppResult<LaunchEvent> {
        let query = [("format", "json".to_string())];
        let normalized = match event.kind {
            EventKind::Launch => {
                let launch: SpaceDevsLaunch = get_json(
                    &self.client,
                    &format!("{}/launch/{}/", self.base_url, event.id),
                    &query,
                )
                .await?;
                launch.normalize()
            }
            EventKind::Event => {
                let item: SpaceDevsEvent = get_json(
                    &self.client,
                    &format!("{}/event/{}/", self.base_url, event.id),
                    &query,
                )
                .await?;
                item.normalize()
            }
        };

        normalized
            .ok_or_else(|| AppError::FeedUnavailable(format!("{} has no window start", event)))
    }
}
