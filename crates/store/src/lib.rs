//! Persistent storage for lexchat session state.

pub mod config;
pub mod file;

pub use config::StoreConfig;
pub use file::FileStore;

use std::sync::Arc;

use lexchat_core::{MemoryStore, SharedStore};
use telemetry::health;
use tracing::{info, warn};

/// Opens the configured store.
///
/// Falls back to an in-memory store when the file cannot be opened, so the
/// client keeps working with state that lasts only for this process.
pub fn open_store(config: &StoreConfig) -> SharedStore {
    if config.in_memory {
        health().store.set_unhealthy("In-memory store configured");
        return Arc::new(MemoryStore::new());
    }

    let path = config.resolved_path();
    match FileStore::open(&path) {
        Ok(store) => {
            info!(path = %path.display(), "Opened state file");
            health().store.set_healthy();
            Arc::new(store)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "State file unavailable, using in-memory store");
            health().store.set_unhealthy(e.to_string());
            Arc::new(MemoryStore::new())
        }
    }
}
