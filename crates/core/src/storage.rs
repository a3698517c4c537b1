//! Key-value storage port.
//!
//! The tracker and the auth session persist a handful of string values
//! through this trait. `lexchat-store` provides the file-backed
//! implementation; `MemoryStore` covers tests and the in-memory fallback.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;

/// Persisted key names.
pub mod keys {
    pub const SESSION_ID: &str = "anonymous-session-id";
    pub const MESSAGE_COUNT: &str = "anonymous-message-count";
    pub const LAST_MESSAGE_TIME: &str = "anonymous-last-message-time";
    pub const USER: &str = "user";
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refresh-token";
}

/// A single write in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl StoreOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// Full contents of a store, as handed to [`KeyValueStore::update`].
pub type Entries = BTreeMap<String, String>;

/// Applies a batch to a map of entries.
pub fn apply_ops(entries: &mut Entries, ops: Vec<StoreOp>) {
    for op in ops {
        match op {
            StoreOp::Set { key, value } => {
                entries.insert(key, value);
            }
            StoreOp::Remove { key } => {
                entries.remove(&key);
            }
        }
    }
}

/// Synchronous string key-value store.
///
/// `apply` must be all-or-nothing: either every op in the batch is
/// visible afterwards or none is. `update` additionally guarantees that no
/// other writer, in this process or another one sharing the store, lands
/// between the read handed to `build` and the write of its batch.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn apply(&self, ops: Vec<StoreOp>) -> Result<()>;

    /// Read-modify-write: `build` sees the current contents and returns the
    /// batch to apply.
    fn update(&self, build: &mut dyn FnMut(&Entries) -> Vec<StoreOp>) -> Result<()>;

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(vec![StoreOp::set(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.apply(vec![StoreOp::remove(key)])
    }
}

/// Shared store handle.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// In-memory store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with entries.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn apply(&self, ops: Vec<StoreOp>) -> Result<()> {
        apply_ops(&mut self.entries.lock(), ops);
        Ok(())
    }

    fn update(&self, build: &mut dyn FnMut(&Entries) -> Vec<StoreOp>) -> Result<()> {
        let mut entries = self.entries.lock();
        let ops = build(&entries);
        apply_ops(&mut entries, ops);
        Ok(())
    }
}
