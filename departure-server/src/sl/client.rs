//! SL Realtime Departures HTTP client.

use std::future::Future;

use tracing::debug;

use super::error::SlError;

/// Default endpoint for the SL Realtime Departures v4 API.
const DEFAULT_BASE_URL: &str = "http://api.sl.se/api2/realtimedeparturesV4.json";

/// How many minutes ahead to request departures for.
pub const TIME_WINDOW_MINS: u16 = 60;

/// Something that can fetch the raw departure JSON for a stop.
///
/// Implemented by the live [`SlClient`] and the file-backed mock, and by
/// test doubles.
pub trait TimetableSource: Send + Sync {
    /// Fetch departures for every transport mode at `site_id`.
    fn fetch_departures(
        &self,
        site_id: &str,
    ) -> impl Future<Output = Result<serde_json::Value, SlError>> + Send;
}

/// Configuration for the SL client.
#[derive(Debug, Clone)]
pub struct SlConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,
    /// Endpoint URL (defaults to production SL)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl SlConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// URL for a departures request.
    ///
    /// Every transport mode is always requested, so one cached response
    /// serves queries for any mode at the stop.
    pub fn departures_url(&self, site_id: &str) -> String {
        format!(
            "{}?key={}&siteid={}&timewindow={}&train=true&bus=true&metro=true&tram=true&ships=true",
            self.base_url, self.api_key, site_id, TIME_WINDOW_MINS
        )
    }
}

/// SL Realtime Departures API client.
#[derive(Debug, Clone)]
pub struct SlClient {
    http: reqwest::Client,
    config: SlConfig,
}

impl SlClient {
    /// Create a new SL client with the given configuration.
    pub fn new(config: SlConfig) -> Result<Self, SlError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// GET a URL and parse the body as JSON.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, SlError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SlError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SlError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| SlError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

impl TimetableSource for SlClient {
    async fn fetch_departures(&self, site_id: &str) -> Result<serde_json::Value, SlError> {
        let url = self.config.departures_url(site_id);
        debug!(site_id, "requesting departures from SL");
        self.get_json(&url).await
    }
}
