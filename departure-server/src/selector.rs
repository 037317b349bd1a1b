//! Next-departure selection.
//!
//! Picks the single departure to show out of a stop's timetable:
//!
//! 1. take the departures for the query's transport mode
//! 2. keep only the requested lines, if any
//! 3. order by expected time
//! 4. take the first one in the requested direction that leaves at least
//!    `skip_minutes` from now
//!
//! Entries without an expected time or direction never qualify.

use chrono::{DateTime, Utc};

use crate::domain::{DepartureError, Query, minutes_until};
use crate::sl::{DepartureEntry, TimetableResponse};

/// Select the next departure for `query` and render it as display tokens.
///
/// Output is `["<m> min"]`, or with `display_line_number` set, the line
/// number and minutes repeated three times:
/// `[line, "<m> min", line, "<m> min", line, "<m> min"]`. The device
/// cycles through frames, so the triple repetition keeps the line visible.
pub fn select_next(
    timetable: &TimetableResponse,
    query: &Query,
    now: DateTime<Utc>,
) -> Result<Vec<String>, DepartureError> {
    let departures = timetable.departures_for(query.transport_mode);
    if departures.is_empty() {
        return Err(DepartureError::NoDeparturesForMode);
    }

    let (next, expected) =
        find_next(departures, query, now).ok_or(DepartureError::NoQualifyingDeparture)?;

    let minutes = format!("{} min", minutes_until(expected, now));
    if query.display_line_number {
        let line = &next.line_number;
        Ok(vec![
            line.clone(),
            minutes.clone(),
            line.clone(),
            minutes.clone(),
            line.clone(),
            minutes,
        ])
    } else {
        Ok(vec![minutes])
    }
}

/// The earliest departure matching the query's line, direction and skip
/// filters, with its expected time.
fn find_next<'a>(
    departures: &'a [DepartureEntry],
    query: &Query,
    now: DateTime<Utc>,
) -> Option<(&'a DepartureEntry, DateTime<Utc>)> {
    let mut candidates: Vec<(&DepartureEntry, DateTime<Utc>)> = departures
        .iter()
        .filter(|d| query.matches_line(&d.line_number))
        .filter_map(|d| Some((d, d.expected_date_time?)))
        .collect();

    candidates.sort_by_key(|(_, expected)| *expected);

    candidates.into_iter().find(|(d, expected)| {
        d.journey_direction == Some(query.journey_direction)
            && minutes_until(*expected, now) >= query.skip_minutes
    })
}
