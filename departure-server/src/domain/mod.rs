//! Domain types for the departure service.
//!
//! Queries, the reasons a lookup can fail, and the time rules that decide
//! minutes-left and cache lifetimes.

mod error;
mod query;
mod time;

pub use error::DepartureError;
pub use query::{InvalidTransportMode, Query, TransportMode};
pub use time::{
    LONG_CACHE_TTL, SHORT_CACHE_TTL, TRANSIT_TZ, TimeError, cache_ttl, minutes_until,
    parse_expected,
};
