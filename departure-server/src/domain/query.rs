//! Departure queries.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an unknown transport mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport mode: {0:?}")]
pub struct InvalidTransportMode(String);

/// A mode of transport as SL groups its departures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportMode {
    Train,
    Bus,
    Metro,
    Tram,
    Ships,
}

impl TransportMode {
    /// All modes, in the order SL's request parameters list them.
    pub const ALL: [TransportMode; 5] = [
        TransportMode::Train,
        TransportMode::Bus,
        TransportMode::Metro,
        TransportMode::Tram,
        TransportMode::Ships,
    ];

    /// The lower-case name used in requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
            TransportMode::Metro => "metro",
            TransportMode::Tram => "tram",
            TransportMode::Ships => "ships",
        }
    }
}

impl FromStr for TransportMode {
    type Err = InvalidTransportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| InvalidTransportMode(s.to_string()))
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants to know: the next departure from a stop.
///
/// Immutable once built. Line numbers are stored lower-cased so that
/// matching against upstream line numbers is case-insensitive.
///
/// # Examples
///
/// ```
/// use departure_server::domain::{Query, TransportMode};
///
/// let query = Query::new("9192", TransportMode::Bus, 1)
///     .with_line_numbers(["55", "57B"])
///     .with_skip_minutes(3);
///
/// assert!(query.matches_line("57b"));
/// assert!(!query.matches_line("4"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// SL site id of the stop.
    pub site_id: String,

    /// Which group of departures to look at.
    pub transport_mode: TransportMode,

    /// Lower-cased line numbers to keep; empty keeps every line.
    pub line_numbers: BTreeSet<String>,

    /// SL journey direction (1 or 2 on most lines).
    pub journey_direction: u32,

    /// Departures fewer than this many minutes away are skipped.
    pub skip_minutes: i64,

    /// Show the line number next to the minutes.
    pub display_line_number: bool,
}

impl Query {
    /// Create a query with no line filter, no skip threshold and minutes-only output.
    pub fn new(
        site_id: impl Into<String>,
        transport_mode: TransportMode,
        journey_direction: u32,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            transport_mode,
            line_numbers: BTreeSet::new(),
            journey_direction,
            skip_minutes: 0,
            display_line_number: false,
        }
    }

    /// Restrict to the given line numbers (matched case-insensitively).
    pub fn with_line_numbers<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.line_numbers = lines
            .into_iter()
            .map(|l| l.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Skip departures leaving in fewer than `mins` minutes.
    pub fn with_skip_minutes(mut self, mins: i64) -> Self {
        self.skip_minutes = mins;
        self
    }

    /// Include the line number in the output.
    pub fn with_display_line_number(mut self, display: bool) -> Self {
        self.display_line_number = display;
        self
    }

    /// Whether an upstream line number passes the line filter.
    pub fn matches_line(&self, line_number: &str) -> bool {
        self.line_numbers.is_empty() || self.line_numbers.contains(&line_number.to_lowercase())
    }

    /// Key under which this query's timetable and failure marker are cached.
    pub fn cache_key(&self) -> String {
        let lines: Vec<&str> = self.line_numbers.iter().map(String::as_str).collect();
        format!(
            "{}:{}:{}:{}:{}:{}",
            self.site_id,
            self.transport_mode,
            lines.join(","),
            self.journey_direction,
            self.skip_minutes,
            self.display_line_number
        )
    }
}
