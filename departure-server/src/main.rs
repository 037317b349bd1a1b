use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use departure_server::cache::ExpiringMap;
use departure_server::clock::{Clock, SystemClock};
use departure_server::config::{API_KEY_VAR, ServerConfig};
use departure_server::departures::RealTimeDepartures;
use departure_server::display::FramesFormatter;
use departure_server::sl::{MockSlClient, SlClient, SlConfig, Upstream};
use departure_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    // Pick the upstream: canned files for development, SL otherwise
    let upstream = match &config.mock_dir {
        Some(dir) => {
            let mock = MockSlClient::new(dir).expect("Failed to load mock SL data");
            info!(sites = ?mock.available_sites(), "serving departures from mock data");
            Upstream::Mock(mock)
        }
        None => {
            if config.api_key.is_empty() {
                warn!("{API_KEY_VAR} not set. API calls will fail.");
            }
            let mut sl_config = SlConfig::new(&config.api_key).with_timeout(config.timeout_secs);
            if let Some(url) = &config.base_url {
                sl_config = sl_config.with_base_url(url);
            }
            Upstream::Live(SlClient::new(sl_config).expect("Failed to create SL client"))
        }
    };

    // Both caches share the clock so expiry and minutes-left agree
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let timetables = ExpiringMap::new(&config.cache, clock.clone());
    let thresholds = ExpiringMap::new(&config.cache, clock.clone());

    let formatter = config
        .icons
        .iter()
        .fold(FramesFormatter::new(), |f, (mode, icon)| f.with_icon(*mode, icon));

    let departures =
        RealTimeDepartures::new(upstream, timetables, thresholds, Arc::new(formatter), clock);

    let app = create_router(AppState::new(departures));

    let addr = config.bind_addr;
    info!("Departure server listening on http://{addr}");
    info!("  GET  /health      - Health check");
    info!("  GET  /departures  - Next departure as display frames");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
