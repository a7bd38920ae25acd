//! Decides which upcoming items are announced on a tick.

use chrono::{DateTime, Duration, Utc};

use crate::services::launch_feed::LaunchEvent;

/// Width of the announcement band starting at the tick instant.
pub const ANNOUNCE_HORIZON_HOURS: i64 = 24;

fn in_band(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant >= now && instant < now + Duration::hours(ANNOUNCE_HORIZON_HOURS)
}

/// True when the event is not TBD and either its window start or its window
/// end (falling back to the start) lies in `[now, now + 24h)`.
pub fn is_announceable(event: &LaunchEvent, now: DateTime<Utc>) -> bool {
    if event.is_tbd {
        return false;
    }
    let closes = event.window_end.unwrap_or(event.window_start);
    in_band(event.window_start, now) || in_band(closes, now)
}
