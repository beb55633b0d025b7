use serde::{Deserialize, Serialize};

use crate::domain::logging::LogLevel;

/// Runtime settings passed in by the host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatafeedSettings {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub first_request_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Wait after bulk shape operations before reading the chart back
    pub settle_delay_ms: u64,
    /// Wait after a configuration switch for the first bars to land
    pub initial_load_settle_ms: u64,
    pub log_level: String,
}

impl Default for DatafeedSettings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            auth_token: None,
            first_request_timeout_ms: 60_000,
            request_timeout_ms: 30_000,
            settle_delay_ms: 300,
            initial_load_settle_ms: 500,
            log_level: "debug".to_string(),
        }
    }
}

impl DatafeedSettings {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Unknown level names fall back to `Debug`.
    pub fn min_log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Debug)
    }

    pub fn timeout_for(&self, first_request: bool) -> u64 {
        if first_request {
            self.first_request_timeout_ms
        } else {
            self.request_timeout_ms
        }
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
