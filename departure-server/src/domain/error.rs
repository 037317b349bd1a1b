//! Departure lookup failures.
//!
//! These are the reasons a query can end without a departure to show.
//! Their `Display` text is what ends up on the device, so it is Swedish.

/// Why no departure could be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DepartureError {
    /// The timetable has no departures at all for the requested mode.
    #[error("inga avgångar för valt färdmedel")]
    NoDeparturesForMode,

    /// Departures exist for the mode, but none match the line, direction
    /// and skip filters.
    #[error("inga avgångar")]
    NoQualifyingDeparture,

    /// The timetable could not be fetched or decoded.
    #[error("Misslyckades att hämta information från SL")]
    UpstreamUnavailable,
}
