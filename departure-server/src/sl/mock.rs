//! Mock SL client for running without an API key.
//!
//! Loads sample responses from JSON files and serves them as if they were
//! live API responses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::client::TimetableSource;
use super::error::SlError;

/// Mock SL client that serves departures from JSON files.
#[derive(Debug, Clone)]
pub struct MockSlClient {
    /// Pre-loaded responses, keyed by site id.
    sites: Arc<HashMap<String, serde_json::Value>>,
}

impl MockSlClient {
    /// Create a mock client by loading JSON files from a directory.
    ///
    /// Expects files named `{siteId}.json` (e.g. `9192.json`).
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, SlError> {
        let sites = load_dir(data_dir.as_ref())?;
        Ok(Self {
            sites: Arc::new(sites),
        })
    }

    /// List the site ids with mock data.
    pub fn available_sites(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sites.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl TimetableSource for MockSlClient {
    async fn fetch_departures(&self, site_id: &str) -> Result<serde_json::Value, SlError> {
        self.sites.get(site_id).cloned().ok_or_else(|| SlError::Api {
            status: 404,
            message: format!("No mock data for site {site_id}"),
        })
    }
}

fn load_dir(data_dir: &Path) -> Result<HashMap<String, serde_json::Value>, SlError> {
    let mut sites = HashMap::new();

    let entries = std::fs::read_dir(data_dir).map_err(|e| SlError::Api {
        status: 0,
        message: format!("Failed to read mock data directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| SlError::Api {
            status: 0,
            message: format!("Failed to read directory entry: {e}"),
        })?;

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let Some(site_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let json = std::fs::read_to_string(&path).map_err(|e| SlError::Api {
            status: 0,
            message: format!("Failed to read {path:?}: {e}"),
        })?;

        let value: serde_json::Value = serde_json::from_str(&json).map_err(|e| SlError::Json {
            message: format!("Failed to parse {path:?}: {e}"),
            body: None,
        })?;

        sites.insert(site_id.to_string(), value);
    }

    if sites.is_empty() {
        return Err(SlError::Api {
            status: 0,
            message: format!("No mock site files found in {data_dir:?}"),
        });
    }

    Ok(sites)
}
