//! Time handling for SL departure data.
//!
//! SL reports expected departure times as local Stockholm wall-clock
//! strings ("2024-03-15T10:05:00"). This module turns them into absolute
//! instants and provides the two time-dependent policies of the service:
//! minutes left until a departure, and how long a fetched timetable may be
//! cached.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Europe::Stockholm;
use chrono_tz::Tz;

/// Cache lifetime during the morning rush (05:00 to 10:00 local time).
pub const SHORT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Cache lifetime for the rest of the day.
pub const LONG_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// The transit system's local time zone.
pub const TRANSIT_TZ: Tz = Stockholm;

/// Error returned when parsing an invalid timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Parse an upstream timestamp into an absolute instant.
///
/// Strings carrying an offset (RFC 3339) are taken at face value. Strings
/// without one are Stockholm local time. A local time that falls in the
/// spring-forward gap is shifted one hour later; an ambiguous autumn time
/// resolves to the earlier instant.
///
/// # Examples
///
/// ```
/// use departure_server::domain::parse_expected;
///
/// // 10:05 in Stockholm during winter is 09:05 UTC.
/// let t = parse_expected("2024-01-15T10:05:00").unwrap();
/// assert_eq!(t.to_rfc3339(), "2024-01-15T09:05:00+00:00");
///
/// assert!(parse_expected("10:05").is_err());
/// ```
pub fn parse_expected(s: &str) -> Result<DateTime<Utc>, TimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| TimeError::new(s, "expected YYYY-MM-DDTHH:MM:SS"))?;

    TRANSIT_TZ
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            TRANSIT_TZ
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeError::new(s, "local time does not exist"))
}

/// Minutes left until `expected`, as seen from `now`.
///
/// Only the minutes component of the remaining duration is returned: the
/// duration is truncated toward zero to whole minutes and the hours are
/// dropped. A departure 1 hour 5 minutes away yields `5`, not `65`.
/// Departures in the past yield zero or negative values.
///
/// ```
/// use chrono::{Duration, Utc};
/// use departure_server::domain::minutes_until;
///
/// let now = Utc::now();
/// assert_eq!(minutes_until(now + Duration::seconds(7 * 60 + 59), now), 7);
/// assert_eq!(minutes_until(now + Duration::minutes(65), now), 5);
/// assert_eq!(minutes_until(now - Duration::minutes(3), now), -3);
/// ```
pub fn minutes_until(expected: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expected - now).num_minutes() % 60
}

/// How long a freshly fetched timetable may be served from cache.
///
/// Short during the morning rush, when departures change quickly, long
/// otherwise. Only the local time of day matters.
pub fn cache_ttl(now: DateTime<Utc>) -> Duration {
    let local = now.with_timezone(&TRANSIT_TZ);
    if (5..10).contains(&local.hour()) {
        SHORT_CACHE_TTL
    } else {
        LONG_CACHE_TTL
    }
}
