//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Query, TransportMode};

/// Query string of `GET /departures`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureRequest {
    /// SL site id of the stop
    pub site_id: String,

    /// train, bus, metro, tram or ships
    pub transport_mode: String,

    /// SL journey direction
    pub journey_direction: u32,

    /// Comma-separated line numbers (e.g. "55,57B"); empty or absent means all lines
    pub line_numbers: Option<String>,

    /// Skip departures leaving sooner than this
    pub skip_minutes: Option<i64>,

    /// Show the line number next to the minutes
    pub display_line_number: Option<bool>,
}

impl DepartureRequest {
    /// Validate the request and build the query it describes.
    pub fn to_query(&self) -> Result<Query, String> {
        let site_id = self.site_id.trim();
        if site_id.is_empty() {
            return Err("siteId must not be empty".to_string());
        }

        let mode: TransportMode = self.transport_mode.parse().map_err(|e| format!("{e}"))?;

        let lines = self
            .line_numbers
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty());

        Ok(Query::new(site_id, mode, self.journey_direction)
            .with_line_numbers(lines)
            .with_skip_minutes(self.skip_minutes.unwrap_or(0))
            .with_display_line_number(self.display_line_number.unwrap_or(false)))
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
