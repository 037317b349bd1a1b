//! Application state for the web layer.

use std::sync::Arc;

use crate::departures::RealTimeDepartures;
use crate::sl::Upstream;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Cached departure lookups
    pub departures: Arc<RealTimeDepartures<Upstream>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(departures: RealTimeDepartures<Upstream>) -> Self {
        Self {
            departures: Arc::new(departures),
        }
    }
}
