//! Store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the state file inside the data directory.
const STATE_FILE: &str = "state.json";

/// Where session state is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Explicit state file path (defaults to `<data dir>/lexchat/state.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Keep state in memory only
    #[serde(default)]
    pub in_memory: bool,
}

impl StoreConfig {
    /// Returns the state file path, falling back to the platform data directory.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }

        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexchat")
            .join(STATE_FILE)
    }
}
