//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::domain::TransportMode;

/// Environment variable holding the SL Realtime Departures v4 API key.
pub const API_KEY_VAR: &str = "REAL_TIME_DEPARTURES_V4_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything `main` needs to start the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SL API key. Empty if unset; SL will then reject requests.
    pub api_key: String,

    /// Override for the SL endpoint.
    pub base_url: Option<String>,

    /// Serve canned responses from this directory instead of calling SL.
    pub mock_dir: Option<PathBuf>,

    /// Address to listen on.
    pub bind_addr: SocketAddr,

    /// Capacity of each cache.
    pub cache: CacheConfig,

    /// SL request timeout in seconds.
    pub timeout_secs: u64,

    /// Icon id to show on frames for each listed mode.
    pub icons: Vec<(TransportMode, String)>,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: v,
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        let timeout_secs = match get("SL_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "SL_TIMEOUT_SECS",
                value: v,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let icons = match get("DISPLAY_ICONS") {
            Some(v) => parse_icons(&v).ok_or(ConfigError::Invalid {
                name: "DISPLAY_ICONS",
                value: v,
            })?,
            None => Vec::new(),
        };

        let mut cache = CacheConfig::default();
        if let Some(v) = get("CACHE_MAX_CAPACITY") {
            cache.max_capacity = v.parse().map_err(|_| ConfigError::Invalid {
                name: "CACHE_MAX_CAPACITY",
                value: v,
            })?;
        }

        Ok(Self {
            api_key: get(API_KEY_VAR).unwrap_or_default(),
            base_url: get("SL_BASE_URL"),
            mock_dir: get("SL_MOCK_DIR").map(PathBuf::from),
            bind_addr,
            cache,
            timeout_secs,
            icons,
        })
    }
}

/// Parse `bus=i996,metro=a1234` into mode/icon pairs.
fn parse_icons(s: &str) -> Option<Vec<(TransportMode, String)>> {
    s.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (mode, icon) = pair.split_once('=')?;
            let mode = mode.trim().parse().ok()?;
            let icon = icon.trim();
            (!icon.is_empty()).then(|| (mode, icon.to_string()))
        })
        .collect()
}
