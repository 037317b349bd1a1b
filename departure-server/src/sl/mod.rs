//! SL (Storstockholms Lokaltrafik) Realtime Departures client.
//!
//! The v4 API returns every departure from a stop within a time window,
//! grouped by transport mode. Expected times are Stockholm local time
//! without an offset.

mod client;
mod error;
mod mock;
mod types;

pub use client::{SlClient, SlConfig, TIME_WINDOW_MINS, TimetableSource};
pub use error::SlError;
pub use mock::MockSlClient;
pub use types::{DepartureEntry, ResponseData, TimetableResponse};

/// The upstream the server was started with.
#[derive(Debug, Clone)]
pub enum Upstream {
    /// The real SL API.
    Live(SlClient),
    /// Canned responses from disk.
    Mock(MockSlClient),
}

impl TimetableSource for Upstream {
    async fn fetch_departures(&self, site_id: &str) -> Result<serde_json::Value, SlError> {
        match self {
            Upstream::Live(client) => client.fetch_departures(site_id).await,
            Upstream::Mock(client) => client.fetch_departures(site_id).await,
        }
    }
}
