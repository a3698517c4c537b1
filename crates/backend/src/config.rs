//! Backend client configuration.

use lexchat_core::limits::DEFAULT_REQUEST_TIMEOUT_SECS;
use lexchat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Backend client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "https://api.example.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parses the base URL, guaranteeing a trailing slash so endpoint paths
    /// append to any path prefix.
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw)
            .map_err(|e| Error::config(format!("Invalid backend URL '{}': {}", self.base_url, e)))?;

        if url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Backend URL '{}' cannot be used as a base",
                self.base_url
            )));
        }

        Ok(url)
    }
}
