//! SL API error types.

/// Errors that can occur when fetching departures from SL.
#[derive(Debug, thiserror::Error)]
pub enum SlError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or missing API key
    #[error("unauthorized: check REAL_TIME_DEPARTURES_V4_KEY")]
    Unauthorized,

    /// Rate limited by the API
    #[error("rate limited by SL API")]
    RateLimited,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body was not JSON
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },
}
