//! Anonymous usage tracker.
//!
//! Owns the session id and the rolling message counter for users without
//! credentials. The limit flag is derived on every read from the counter
//! and the reset window, so it can never disagree with them.
//!
//! Storage failures never abort an operation: the tracker logs them, stops
//! writing, and keeps serving from memory for the rest of the process.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::error::Result;
use crate::session::{SessionRecord, TrackerConfig};
use crate::storage::{keys, Entries, SharedStore, StoreOp};

/// Tracker shared between the workflow and the presentation layer.
pub type SharedTracker = Arc<Mutex<AnonymousTracker>>;

/// Values read back from the store.
#[derive(Debug, Default)]
struct Persisted {
    session_id: Option<String>,
    message_count: u32,
    last_message_timestamp: Option<i64>,
}

pub struct AnonymousTracker {
    store: SharedStore,
    clock: SharedClock,
    config: TrackerConfig,
    session_id: String,
    message_count: u32,
    last_message_timestamp: Option<i64>,
    /// Set when the session hit the limit while anonymous; consumed after login.
    limit_transition: bool,
    /// False once the store has failed; later writes are skipped.
    persistent: bool,
}

impl AnonymousTracker {
    /// Loads the persisted session, creating one if none exists.
    pub fn initialize(store: SharedStore, clock: SharedClock, config: TrackerConfig) -> Self {
        let mut tracker = Self {
            store,
            clock,
            config,
            session_id: String::new(),
            message_count: 0,
            last_message_timestamp: None,
            limit_transition: false,
            persistent: true,
        };

        let persisted = match tracker.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Session storage unavailable, using in-memory session");
                tracker.persistent = false;
                Persisted::default()
            }
        };

        match persisted.session_id {
            Some(id) => tracker.session_id = id,
            None => {
                tracker.session_id = Uuid::new_v4().to_string();
                let id = tracker.session_id.clone();
                tracker.persist(vec![StoreOp::set(keys::SESSION_ID, id)]);
                debug!(session_id = %tracker.session_id, "Created anonymous session");
            }
        }

        tracker.message_count = persisted.message_count;
        tracker.last_message_timestamp = persisted.last_message_timestamp;

        if tracker.window_elapsed() {
            info!(session_id = %tracker.session_id, "Reset window elapsed since last run");
            tracker.clear_counter();
        }

        tracker
    }

    /// Reads the persisted values.
    fn load(&self) -> Result<Persisted> {
        let session_id = self
            .store
            .get(keys::SESSION_ID)?
            .filter(|id| !id.trim().is_empty());

        let count = self.store.get(keys::MESSAGE_COUNT)?;
        let last = self.store.get(keys::LAST_MESSAGE_TIME)?;
        let (message_count, last_message_timestamp) =
            self.parse_counter(count.as_deref(), last.as_deref());

        Ok(Persisted {
            session_id,
            message_count,
            last_message_timestamp,
        })
    }

    /// Unparseable numbers are treated as absent. A count without a usable
    /// timestamp could never age out, so it is dropped too.
    fn parse_counter(&self, count: Option<&str>, last: Option<&str>) -> (u32, Option<i64>) {
        let last = last.and_then(|raw| self.parse_timestamp(raw));
        let count = count
            .and_then(|raw| match raw.trim().parse::<u32>() {
                Ok(count) => Some(count),
                Err(_) => {
                    warn!(value = %raw, "Ignoring corrupt message count");
                    None
                }
            })
            .unwrap_or(0);

        if last.is_none() && count > 0 {
            warn!(count, "Ignoring message count without a last message time");
            return (0, None);
        }
        (count, last)
    }

    /// Counter as stored, restarted if its window has elapsed.
    fn stored_counter(&self, entries: &Entries) -> u32 {
        let (count, last) = self.parse_counter(
            entries.get(keys::MESSAGE_COUNT).map(String::as_str),
            entries.get(keys::LAST_MESSAGE_TIME).map(String::as_str),
        );
        match last {
            Some(last) if !self.elapsed_since(last) => count,
            _ => 0,
        }
    }

    /// A stored "0" means no message was ever recorded. A time in the future
    /// would hold the gate shut forever, so it is discarded like a corrupt
    /// count.
    fn parse_timestamp(&self, raw: &str) -> Option<i64> {
        let ms = raw.trim().parse::<i64>().ok().filter(|ms| *ms > 0)?;
        if ms > self.clock.now_millis() {
            warn!(value = %raw, "Ignoring last message time in the future");
            return None;
        }
        Some(ms)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn last_message_timestamp(&self) -> Option<i64> {
        self.last_message_timestamp
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Whether state is still being written to the store.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// True when the counter is at the limit and the window has not elapsed.
    pub fn is_limit_reached(&self) -> bool {
        self.message_count >= self.config.message_limit && !self.window_elapsed()
    }

    /// Messages left before the gate closes.
    pub fn remaining(&self) -> u32 {
        if self.window_elapsed() {
            return self.config.message_limit;
        }
        self.config.message_limit.saturating_sub(self.message_count)
    }

    /// Epoch millis at which the counter will reset, if a message was recorded.
    pub fn resets_at(&self) -> Option<i64> {
        self.last_message_timestamp
            .map(|last| last.saturating_add(self.config.reset_window_millis()))
    }

    /// Picks up counter changes made by other processes sharing the store,
    /// such as sends from a second terminal or a login that reset it.
    pub fn refresh_from_store(&mut self) {
        if !self.persistent {
            return;
        }

        let stored = self.store.get(keys::MESSAGE_COUNT).and_then(|count| {
            let last = self.store.get(keys::LAST_MESSAGE_TIME)?;
            Ok((count, last))
        });

        match stored {
            Ok((count, last)) => {
                let (count, last) = self.parse_counter(count.as_deref(), last.as_deref());
                if count != self.message_count {
                    debug!(
                        session_id = %self.session_id,
                        from = self.message_count,
                        to = count,
                        "Message count changed in store"
                    );
                }
                self.message_count = count;
                self.last_message_timestamp = last;
                if self.is_limit_reached() {
                    self.limit_transition = true;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read anonymous session, continuing in memory");
                self.persistent = false;
            }
        }
    }

    /// Clears the counter if the reset window has elapsed. Returns whether a
    /// reset happened.
    pub fn check_and_apply_time_reset(&mut self) -> bool {
        if !self.window_elapsed() {
            return false;
        }

        info!(
            session_id = %self.session_id,
            message_count = self.message_count,
            "Anonymous message window elapsed, resetting count"
        );
        self.clear_counter();
        self.limit_transition = false;
        true
    }

    /// Counts one anonymous message. The count and timestamp are written in
    /// one batch on top of whatever the store holds at that moment.
    pub fn increment(&mut self) {
        let now = self.clock.now_millis();
        let mut count = self.message_count.saturating_add(1);

        if self.persistent {
            let written = self.store.update(&mut |entries| {
                count = self.stored_counter(entries).saturating_add(1);
                vec![
                    StoreOp::set(keys::MESSAGE_COUNT, count.to_string()),
                    StoreOp::set(keys::LAST_MESSAGE_TIME, now.to_string()),
                ]
            });
            if let Err(e) = written {
                warn!(error = %e, "Failed to persist anonymous session, continuing in memory");
                self.persistent = false;
                count = self.message_count.saturating_add(1);
            }
        }

        self.message_count = count;
        self.last_message_timestamp = Some(now);

        if self.message_count >= self.config.message_limit {
            self.limit_transition = true;
            info!(
                session_id = %self.session_id,
                message_count = self.message_count,
                "Anonymous message limit reached"
            );
        }
    }

    /// Clears the counter after a successful login. The session id is kept so
    /// chats started anonymously stay linked to it.
    pub fn reset_after_authentication(&mut self) {
        debug!(session_id = %self.session_id, "Resetting anonymous state after login");
        self.clear_counter();
    }

    /// Consumes the "hit the limit while anonymous" flag.
    pub fn take_limit_transition(&mut self) -> bool {
        std::mem::take(&mut self.limit_transition)
    }

    pub fn limit_transition_pending(&self) -> bool {
        self.limit_transition
    }

    pub fn snapshot(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.session_id.clone(),
            message_count: self.message_count,
            last_message_timestamp: self.last_message_timestamp,
            is_limit_reached: self.is_limit_reached(),
        }
    }

    /// Wraps the tracker for sharing.
    pub fn into_shared(self) -> SharedTracker {
        Arc::new(Mutex::new(self))
    }

    fn window_elapsed(&self) -> bool {
        self.last_message_timestamp
            .is_some_and(|last| self.elapsed_since(last))
    }

    fn elapsed_since(&self, last: i64) -> bool {
        self.clock.now_millis().saturating_sub(last) >= self.config.reset_window_millis()
    }

    fn clear_counter(&mut self) {
        self.message_count = 0;
        self.last_message_timestamp = None;
        self.persist(vec![
            StoreOp::remove(keys::MESSAGE_COUNT),
            StoreOp::remove(keys::LAST_MESSAGE_TIME),
        ]);
    }

    fn persist(&mut self, ops: Vec<StoreOp>) {
        if !self.persistent {
            return;
        }
        if let Err(e) = self.store.apply(ops) {
            warn!(error = %e, "Failed to persist anonymous session, continuing in memory");
            self.persistent = false;
        }
    }
}

impl std::fmt::Debug for AnonymousTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonymousTracker")
            .field("session_id", &self.session_id)
            .field("message_count", &self.message_count)
            .field("last_message_timestamp", &self.last_message_timestamp)
            .field("limit_transition", &self.limit_transition)
            .field("persistent", &self.persistent)
            .finish()
    }
}
