//! Application configuration.

use anyhow::{Context, Result};
use lexchat_backend::BackendConfig;
use lexchat_core::TrackerConfig;
use lexchat_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Anonymous usage limits
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Load configuration from files and environment.
pub fn load_config(file: Option<&str>) -> Result<AppConfig> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(
            config::File::with_name(file.unwrap_or("config/default"))
                .required(file.is_some())
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. LEXCHAT__BACKEND__BASE_URL
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("LEXCHAT")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the common keys; nested parsing trips over
    // underscored field names
    if let Ok(url) = std::env::var("LEXCHAT_BACKEND_URL") {
        config.backend.base_url = url;
    }
    if let Ok(timeout) = std::env::var("LEXCHAT_REQUEST_TIMEOUT_SECS") {
        config.backend.request_timeout_secs = timeout
            .parse()
            .context("LEXCHAT_REQUEST_TIMEOUT_SECS must be a number")?;
    }
    if let Ok(path) = std::env::var("LEXCHAT_STATE_FILE") {
        config.store.path = Some(PathBuf::from(path));
    }
    if let Ok(limit) = std::env::var("LEXCHAT_MESSAGE_LIMIT") {
        config.tracker.message_limit = limit
            .parse()
            .context("LEXCHAT_MESSAGE_LIMIT must be a number")?;
    }
    if let Ok(hours) = std::env::var("LEXCHAT_RESET_WINDOW_HOURS") {
        config.tracker.reset_window_hours = hours
            .parse()
            .context("LEXCHAT_RESET_WINDOW_HOURS must be a number")?;
    }

    if config.tracker.message_limit == 0 {
        anyhow::bail!("tracker.message_limit must be at least 1");
    }
    if config.tracker.reset_window_hours <= 0 {
        anyhow::bail!("tracker.reset_window_hours must be positive");
    }

    Ok(config)
}
