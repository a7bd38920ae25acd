//! Renders a [`LaunchEvent`] into an announcement.
//!
//! Everything here is pure: the same event and timezone always produce the
//! same message.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::services::launch_feed::{ImageCandidateSet, LaunchEvent, ReferenceKind};
use crate::services::message::{ActionBlock, AnnouncementMessage, MessageAction, ANNOUNCEMENT_COLOR};

pub const REMIND_ACTION_NAME: &str = "remind";

/// Slack date token: clients render `epoch` in the reader's own timezone and
/// fall back to the text after `|`.
pub fn date_token(instant: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "<!date^{}^{{date_short_pretty}} at {{time}}|{}>",
        instant.timestamp(),
        fallback_time(instant, tz)
    )
}

/// `M/D h:mm AM TZ` in the target timezone.
pub fn fallback_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%-m/%-d %-I:%M %p %Z")
        .to_string()
}

/// Pick the image URL for the second declared size variant.
///
/// The last `_`-delimited segment of `base_url` encodes a size and is replaced
/// with `size_variants[1]`, keeping the extension. Placeholder images and
/// descriptors without a second variant yield `None`.
pub fn select_image_variant(base_url: &str, size_variants: &[String]) -> Option<String> {
    if base_url.contains("placeholder") {
        return None;
    }
    let variant = size_variants.get(1)?;
    let (stem, size_segment) = base_url.rsplit_once('_')?;
    let (_, extension) = size_segment.rsplit_once('.')?;
    Some(format!("{}_{}.{}", stem, variant, extension))
}

fn reference_labels(event: &LaunchEvent) -> Vec<String> {
    let mission_count = event
        .reference_links
        .iter()
        .filter(|l| l.kind == ReferenceKind::Mission)
        .count();

    let mut mission_index = 0;
    event
        .reference_links
        .iter()
        .map(|link| {
            let label = match link.kind {
                ReferenceKind::Rocket => "rocket".to_string(),
                ReferenceKind::MoreInfo => "more info".to_string(),
                ReferenceKind::Mission if mission_count > 1 => {
                    mission_index += 1;
                    format!("mission {}", mission_index)
                }
                ReferenceKind::Mission => "mission".to_string(),
            };
            format!("<{}|{}>", link.url, label)
        })
        .collect()
}

fn parenthesized(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn image_for(candidate: &ImageCandidateSet) -> Option<String> {
    if candidate.size_variants.is_empty() {
        return Some(candidate.base_url.clone()).filter(|url| !url.contains("placeholder"));
    }
    select_image_variant(&candidate.base_url, &candidate.size_variants)
}

fn watch_actions(videos: &[String]) -> impl Iterator<Item = MessageAction> + '_ {
    let numbered = videos.len() > 1;
    videos.iter().enumerate().map(move |(idx, url)| MessageAction::Link {
        text: if numbered {
            format!("Watch Live #{}", idx + 1)
        } else {
            "Watch Live".to_string()
        },
        fallback: Some(format!("Watch it live at {}", url)),
        url: url.clone(),
    })
}

pub fn compose(event: &LaunchEvent, tz: Tz) -> AnnouncementMessage {
    let mut text = format!(
        "*{}*{}\n",
        event.name,
        parenthesized(&reference_labels(event))
    );

    if let Some(net) = event.net_time {
        text.push_str(&format!("T-0: {}\n", date_token(net, tz)));
    }

    if let Some(p) = event.weather_go_probability.filter(|p| *p >= 0) {
        text.push_str(&format!("Weather: {}% go\n", p));
    }

    match event.window_end {
        Some(end) if end != event.window_start => text.push_str(&format!(
            "Window: {} - {}\n",
            date_token(event.window_start, tz),
            date_token(end, tz)
        )),
        _ => text.push_str(&format!("Window: {}\n", date_token(event.window_start, tz))),
    }

    if let Some(pad) = &event.pad_name {
        let mut links = Vec::new();
        if let Some(wiki) = &event.pad_wiki_url {
            links.push(format!("<{}|wiki>", wiki));
        }
        if let Some(map) = &event.pad_map_url {
            links.push(format!("<{}|map>", map));
        }
        text.push_str(&format!("{}{}\n", pad, parenthesized(&links)));
    }

    for line in &event.description_lines {
        text.push_str(&format!("\n{}\n", line));
    }

    let reference = event.reference().to_string();
    let mut actions = vec![MessageAction::Callback {
        name: REMIND_ACTION_NAME.to_string(),
        text: "Remind Me".to_string(),
        value: reference.clone(),
    }];
    actions.extend(watch_actions(&event.video_links));

    AnnouncementMessage {
        text,
        attachment: Some(ActionBlock {
            callback_id: Some(reference),
            fallback: Some("Launch Actions".to_string()),
            color: Some(ANNOUNCEMENT_COLOR.to_string()),
            actions,
            ..Default::default()
        }),
        images: event.image_candidate.as_ref().and_then(image_for).into_iter().collect(),
        ..Default::default()
    }
}
