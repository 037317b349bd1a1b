//! SL Realtime Departures v4 response DTOs.
//!
//! These map directly to the JSON the API returns. SL omits or nulls
//! `ResponseData` when a request fails, so it is optional. Fields we don't
//! use are kept as raw JSON on each departure.
//!
//! Individual departures are decoded leniently: a missing or malformed
//! timestamp, direction or line number leaves that field empty instead of
//! failing the whole response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::domain::{TransportMode, parse_expected};

/// Top-level response from `realtimedeparturesV4.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimetableResponse {
    /// 0 on success; anything else is an SL error code.
    pub status_code: i64,

    /// Error description when `status_code` is non-zero.
    #[serde(default)]
    pub message: Option<String>,

    /// Server-side execution time in milliseconds.
    #[serde(default)]
    pub execution_time: Option<i64>,

    /// The departures, grouped by mode.
    #[serde(default)]
    pub response_data: Option<ResponseData>,
}

impl TimetableResponse {
    /// Departures for one transport mode, in upstream order.
    ///
    /// Empty if the response has no data or no departures for that mode.
    pub fn departures_for(&self, mode: TransportMode) -> &[DepartureEntry] {
        let Some(data) = &self.response_data else {
            return &[];
        };
        let departures = match mode {
            TransportMode::Train => &data.trains,
            TransportMode::Bus => &data.buses,
            TransportMode::Metro => &data.metros,
            TransportMode::Tram => &data.trams,
            TransportMode::Ships => &data.ships,
        };
        departures.as_deref().unwrap_or_default()
    }
}

/// Departures grouped by transport mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseData {
    /// When SL last updated this stop's data.
    #[serde(default)]
    pub latest_update: Option<String>,

    /// Age of the data in seconds.
    #[serde(default)]
    pub data_age: Option<i64>,

    #[serde(default)]
    pub metros: Option<Vec<DepartureEntry>>,

    #[serde(default)]
    pub buses: Option<Vec<DepartureEntry>>,

    #[serde(default)]
    pub trains: Option<Vec<DepartureEntry>>,

    #[serde(default)]
    pub trams: Option<Vec<DepartureEntry>>,

    #[serde(default)]
    pub ships: Option<Vec<DepartureEntry>>,

    /// Disruption notices for the stop.
    #[serde(default)]
    pub stop_point_deviations: Option<Vec<serde_json::Value>>,
}

/// One scheduled or real-time departure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DepartureEntry {
    /// Public line number, e.g. "55" or "43X". Empty if SL sent none.
    #[serde(default, deserialize_with = "deserialize_line")]
    pub line_number: String,

    /// Expected departure, resolved from Stockholm local time.
    #[serde(default, deserialize_with = "deserialize_expected")]
    pub expected_date_time: Option<DateTime<Utc>>,

    /// 1 or 2 on most lines.
    #[serde(default, deserialize_with = "deserialize_direction")]
    pub journey_direction: Option<u32>,

    /// SL's own mode name ("BUS", "METRO", ...).
    #[serde(default)]
    pub transport_mode: Option<String>,

    /// Destination shown on the vehicle.
    #[serde(default)]
    pub destination: Option<String>,

    /// SL's own display string ("Nu", "5 min", "10:42").
    #[serde(default)]
    pub display_time: Option<String>,

    /// Everything else SL sends, untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn deserialize_expected<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(s) = value.as_str() else {
        return Ok(None);
    };
    match parse_expected(s) {
        Ok(t) => Ok(Some(t)),
        Err(e) => {
            warn!(error = %e, "ignoring departure with unreadable expected time");
            Ok(None)
        }
    }
}

fn deserialize_direction<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn deserialize_line<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
        "StatusCode": 0,
        "Message": null,
        "ExecutionTime": 412,
        "ResponseData": {
            "LatestUpdate": "2024-01-15T10:00:12",
            "DataAge": 23,
            "Metros": [],
            "Buses": [
                {
                    "GroupOfLine": null,
                    "TransportMode": "BUS",
                    "LineNumber": "55",
                    "Destination": "Tanto",
                    "JourneyDirection": 2,
                    "StopAreaName": "Tegelbacken",
                    "StopAreaNumber": 10075,
                    "StopPointNumber": 10075,
                    "StopPointDesignation": "A",
                    "TimeTabledDateTime": "2024-01-15T10:05:00",
                    "ExpectedDateTime": "2024-01-15T10:06:00",
                    "DisplayTime": "5 min",
                    "JourneyNumber": 12345,
                    "Deviations": null,
                    "SiteId": 1079
                }
            ],
            "Trains": [],
            "Trams": [],
            "Ships": [],
            "StopPointDeviations": []
        }
    }"#;

    #[test]
    fn decode_sample_response() {
        let response: TimetableResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.status_code, 0);
        assert_eq!(response.execution_time, Some(412));

        let buses = response.departures_for(TransportMode::Bus);
        assert_eq!(buses.len(), 1);

        let bus = &buses[0];
        assert_eq!(bus.line_number, "55");
        assert_eq!(bus.journey_direction, Some(2));
        assert_eq!(bus.destination.as_deref(), Some("Tanto"));
        assert_eq!(
            bus.expected_date_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 6, 0).unwrap())
        );
        assert_eq!(bus.extra["StopPointDesignation"], "A");
        assert_eq!(bus.extra["SiteId"], 1079);
    }

    #[test]
    fn modes_map_to_their_groups() {
        let response: TimetableResponse = serde_json::from_str(SAMPLE).unwrap();
        assert!(response.departures_for(TransportMode::Metro).is_empty());
        assert!(response.departures_for(TransportMode::Train).is_empty());
        assert!(response.departures_for(TransportMode::Tram).is_empty());
        assert!(response.departures_for(TransportMode::Ships).is_empty());
    }

    #[test]
    fn missing_groups_are_empty() {
        let json = r#"{"StatusCode": 0, "ResponseData": {"Buses": null}}"#;
        let response: TimetableResponse = serde_json::from_str(json).unwrap();
        assert!(response.departures_for(TransportMode::Bus).is_empty());
        assert!(response.departures_for(TransportMode::Ships).is_empty());
    }

    #[test]
    fn error_response_has_no_data() {
        let json = r#"{"StatusCode": 1002, "Message": "Key is invalid", "ResponseData": null}"#;
        let response: TimetableResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status_code, 1002);
        assert_eq!(response.message.as_deref(), Some("Key is invalid"));
        assert!(response.departures_for(TransportMode::Bus).is_empty());
    }

    #[test]
    fn bad_fields_leave_the_entry_incomplete() {
        let json = r#"{
            "StatusCode": 0,
            "ResponseData": {
                "Buses": [
                    {"LineNumber": "55", "ExpectedDateTime": "soon", "JourneyDirection": 1},
                    {"LineNumber": 4, "ExpectedDateTime": null, "JourneyDirection": "2"},
                    {"ExpectedDateTime": "2024-01-15T10:06:00"}
                ]
            }
        }"#;
        let response: TimetableResponse = serde_json::from_str(json).unwrap();
        let buses = response.departures_for(TransportMode::Bus);
        assert_eq!(buses.len(), 3);

        assert_eq!(buses[0].expected_date_time, None);
        assert_eq!(buses[0].journey_direction, Some(1));

        assert_eq!(buses[1].line_number, "4");
        assert_eq!(buses[1].expected_date_time, None);
        assert_eq!(buses[1].journey_direction, Some(2));

        assert_eq!(buses[2].line_number, "");
        assert!(buses[2].expected_date_time.is_some());
        assert_eq!(buses[2].journey_direction, None);
    }

    #[test]
    fn non_object_body_fails_decoding() {
        assert!(serde_json::from_str::<TimetableResponse>("[1, 2, 3]").is_err());
        assert!(serde_json::from_str::<TimetableResponse>(r#"{"unexpected": true}"#).is_err());
    }
}
