//! Adapter for the launchlibrary.net 1.4 schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{
    get_json, non_empty, EventKind, EventRef, ImageCandidateSet, LaunchEvent, LaunchFeed,
    ReferenceKind, ReferenceLink,
};
use crate::error::{AppError, AppResult};

/// `windowstart`/`windowend`/`net` text format, e.g. `June 2, 2020 07:25:00 UTC`.
const LEGACY_TIME_FORMAT: &str = "%B %d, %Y %H:%M:%S UTC";

#[derive(Debug, Deserialize)]
struct LaunchList {
    #[serde(default)]
    launches: Vec<LegacyLaunch>,
}

#[derive(Debug, Deserialize)]
struct LegacyLaunch {
    id: Value,
    name: String,
    windowstart: Option<String>,
    windowend: Option<String>,
    net: Option<String>,
    wsstamp: Option<i64>,
    westamp: Option<i64>,
    netstamp: Option<i64>,
    tbdtime: Option<i64>,
    probability: Option<i32>,
    #[serde(rename = "vidURLs", default)]
    vid_urls: Option<Vec<String>>,
    rocket: Option<LegacyRocket>,
    #[serde(default)]
    missions: Option<Vec<LegacyMission>>,
    location: Option<LegacyLocation>,
}

#[derive(Debug, Deserialize)]
struct LegacyRocket {
    #[serde(rename = "wikiURL")]
    wiki_url: Option<String>,
    #[serde(rename = "imageURL")]
    image_url: Option<String>,
    #[serde(rename = "imageSizes", default)]
    image_sizes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LegacyMission {
    description: Option<String>,
    #[serde(rename = "wikiURL")]
    wiki_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyLocation {
    #[serde(default)]
    pads: Vec<LegacyPad>,
}

#[derive(Debug, Deserialize)]
struct LegacyPad {
    name: Option<String>,
    #[serde(rename = "wikiURL")]
    wiki_url: Option<String>,
    #[serde(rename = "mapURL")]
    map_url: Option<String>,
}

/// Prefer the epoch stamp; `0` means the feed does not know it.
fn parse_instant(stamp: Option<i64>, text: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(stamp) = stamp.filter(|s| *s > 0) {
        if let Some(ts) = Utc.timestamp_opt(stamp, 0).single() {
            return Some(ts);
        }
    }

    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(text, LEGACY_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LegacyLaunch {
    fn normalize(self) -> Option<LaunchEvent> {
        let id = value_to_string(&self.id)?;
        let window_start = parse_instant(self.wsstamp, self.windowstart.as_deref());
        let Some(window_start) = window_start else {
            tracing::debug!("Dropping launch {} without a window start", id);
            return None;
        };

        let mut event = LaunchEvent::new(EventKind::Launch, id, self.name, window_start);
        event.window_end = parse_instant(self.westamp, self.windowend.as_deref());
        event.net_time = parse_instant(self.netstamp, self.net.as_deref());
        event.is_tbd = self.tbdtime != Some(0);
        event.weather_go_probability = self.probability;

        if let Some(rocket) = self.rocket {
            if let Some(wiki) = non_empty(rocket.wiki_url) {
                event
                    .reference_links
                    .push(ReferenceLink::new(ReferenceKind::Rocket, wiki));
            }
            if let Some(base_url) = non_empty(rocket.image_url) {
                event.image_candidate = Some(ImageCandidateSet {
                    base_url,
                    size_variants: rocket.image_sizes.iter().filter_map(value_to_string).collect(),
                });
            }
        }

        for mission in self.missions.unwrap_or_default() {
            if let Some(wiki) = non_empty(mission.wiki_url) {
                event
                    .reference_links
                    .push(ReferenceLink::new(ReferenceKind::Mission, wiki));
            }
            if let Some(description) = non_empty(mission.description) {
                event.description_lines.push(description);
            }
        }

        if let Some(pad) = self
            .location
            .and_then(|location| location.pads.into_iter().next())
        {
            event.pad_name = non_empty(pad.name);
            event.pad_wiki_url = non_empty(pad.wiki_url);
            event.pad_map_url = non_empty(pad.map_url);
        }

        event.video_links = self
            .vid_urls
            .unwrap_or_default()
            .into_iter()
            .filter(|u| !u.trim().is_empty())
            .collect();

        Some(event)
    }
}

pub struct LegacyFeedClient {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl LegacyFeedClient {
    pub fn new(client: reqwest::Client, base_url: &str, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }
}

#[async_trait]
impl LaunchFeed for LegacyFeedClient {
    async fn fetch_upcoming(&self) -> AppResult<Vec<LaunchEvent>> {
        let list: LaunchList = get_json(
            &self.client,
            &format!("{}/launch", self.base_url),
            &[
                ("mode", "verbose".to_string()),
                ("next", self.limit.to_string()),
            ],
        )
        .await?;

        Ok(list
            .launches
            .into_iter()
            .filter_map(LegacyLaunch::normalize)
            .collect())
    }

    async fn fetch_event(&self, event: &EventRef) -> AppResult<LaunchEvent> {
        if event.kind == EventKind::Event {
            return Err(AppError::FeedUnavailable(format!(
                "The 1.4 feed has no generic events (requested {})",
                event
            )));
        }

        let list: LaunchList = get_json(
            &self.client,
            &format!("{}/launch/{}", self.base_url, event.id),
            &[("mode", "verbose".to_string())],
        )
        .await?;

        list.launches
            .into_iter()
            .next()
            .and_then(LegacyLaunch::normalize)
            .ok_or_else(|| {
                AppError::FeedUnavailable(format!("Launch {} not found or has no window", event))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn sample_launch() -> Value {
        serde_json::json!({
            "id": 1520,
            "name": "Falcon 9 Block 5 | Starlink",
            "windowstart": "June 2, 2020 07:25:00 UTC",
            "windowend": "June 2, 2020 07:35:00 UTC",
            "net": "June 2, 2020 07:25:00 UTC",
            "wsstamp": 1591082700,
            "westamp": 1591083300,
            "netstamp": 1591082700,
            "tbdtime": 0,
            "probability": 70,
            "vidURLs": ["https://youtube.com/a", "https://youtube.com/b"],
            "rocket": {
                "wikiURL": "https://en.wikipedia.org/wiki/Falcon_9",
                "imageURL": "https://s3.amazonaws.com/launchlibrary/RocketImages/Falcon9_1920.jpg",
                "imageSizes": [320, 480, 640, 1920]
            },
            "missions": [
                {"description": "Starlink batch", "wikiURL": "https://en.wikipedia.org/wiki/Starlink"},
                {"description": "Rideshare", "wikiURL": ""}
            ],
            "location": {
                "pads": [{
                    "name": "SLC-40",
                    "wikiURL": "https://en.wikipedia.org/wiki/SLC-40",
                    "mapURL": ""
                }]
            }
        })
    }

    #[test]
    fn normalizes_verbose_launch() {
        let launch: LegacyLaunch = serde_json::from_value(sample_launch()).unwrap();
        let event = launch.normalize().expect("has window start");

        assert_eq!(event.id, "1520");
        assert_eq!(event.kind, EventKind::Launch);
        assert_eq!(event.window_start.timestamp(), 1591082700);
        assert_eq!(event.window_end.map(|t| t.timestamp()), Some(1591083300));
        assert!(!event.is_tbd);
        assert_eq!(event.weather_go_probability, Some(70));
        assert_eq!(event.pad_name.as_deref(), Some("SLC-40"));
        assert_eq!(event.pad_map_url, None);
        assert_eq!(
            event.reference_links,
            vec![
                ReferenceLink::new(ReferenceKind::Rocket, "https://en.wikipedia.org/wiki/Falcon_9"),
                ReferenceLink::new(ReferenceKind::Mission, "https://en.wikipedia.org/wiki/Starlink"),
            ]
        );
        assert_eq!(event.description_lines, vec!["Starlink batch", "Rideshare"]);
        assert_eq!(event.video_links.len(), 2);
        let image = event.image_candidate.expect("image");
        assert_eq!(image.size_variants, vec!["320", "480", "640", "1920"]);
    }

    #[test]
    fn falls_back_to_text_timestamps_when_stamps_are_zero() {
        let mut raw = sample_launch();
        raw["wsstamp"] = serde_json::json!(0);
        raw["windowstart"] = serde_json::json!("July 4, 2021 9:05:00 UTC");
        let launch: LegacyLaunch = serde_json::from_value(raw).unwrap();
        let event = launch.normalize().unwrap();
        assert_eq!(
            event.window_start,
            Utc.with_ymd_and_hms(2021, 7, 4, 9, 5, 0).unwrap()
        );
    }

    #[test]
    fn missing_tbdtime_counts_as_tbd() {
        let mut raw = sample_launch();
        raw.as_object_mut().unwrap().remove("tbdtime");
        let launch: LegacyLaunch = serde_json::from_value(raw).unwrap();
        assert!(launch.normalize().unwrap().is_tbd);
    }

    #[tokio::test]
    async fn fetch_upcoming_drops_launches_without_window_start() {
        let server = MockServer::start();
        let mut no_window = sample_launch();
        no_window["id"] = serde_json::json!(1521);
        no_window["wsstamp"] = serde_json::json!(0);
        no_window["windowstart"] = serde_json::json!("");

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/launch")
                .query_param("mode", "verbose")
                .query_param("next", "5");
            then.status(200)
                .json_body(serde_json::json!({ "launches": [no_window, sample_launch()] }));
        });

        let feed = LegacyFeedClient::new(reqwest::Client::new(), &server.base_url(), 5);
        let events = feed.fetch_upcoming().await.unwrap();

        mock.assert();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "1520");
    }

    #[tokio::test]
    async fn server_error_is_feed_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/launch");
            then.status(503).body("maintenance");
        });

        let feed = LegacyFeedClient::new(reqwest::Client::new(), &server.base_url(), 5);
        match feed.fetch_upcoming().await {
            Err(AppError::FeedUnavailable(msg)) => assert!(msg.contains("503")),
            other => panic!("expected FeedUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn event_lookup_is_not_supported() {
        let feed = LegacyFeedClient::new(reqwest::Client::new(), "http://127.0.0.1:9", 5);
        assert!(matches!(
            feed.fetch_event(&EventRef::event("7")).await,
            Err(AppError::FeedUnavailable(_))
        ));
    }
}
