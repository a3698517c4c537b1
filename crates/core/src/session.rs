//! Anonymous session record and tracker configuration.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::limits::{DEFAULT_MESSAGE_LIMIT, DEFAULT_RESET_WINDOW_HOURS};

/// Point-in-time view of the anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Stable opaque session identifier
    pub session_id: String,
    /// Anonymous messages sent since the last reset
    pub message_count: u32,
    /// Epoch millis of the most recent anonymous message
    pub last_message_timestamp: Option<i64>,
    /// Whether the anonymous limit currently blocks sending
    pub is_limit_reached: bool,
}

impl SessionRecord {
    /// Time of the last anonymous message.
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// Anonymous usage limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Messages allowed per window
    #[serde(default = "default_message_limit")]
    pub message_limit: u32,
    /// Hours after the last message before the counter resets
    #[serde(default = "default_reset_window_hours")]
    pub reset_window_hours: i64,
}

fn default_message_limit() -> u32 {
    DEFAULT_MESSAGE_LIMIT
}

fn default_reset_window_hours() -> i64 {
    DEFAULT_RESET_WINDOW_HOURS
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            message_limit: default_message_limit(),
            reset_window_hours: default_reset_window_hours(),
        }
    }
}

impl TrackerConfig {
    pub fn reset_window(&self) -> Duration {
        Duration::milliseconds(self.reset_window_millis())
    }

    pub fn reset_window_millis(&self) -> i64 {
        self.reset_window_hours.saturating_mul(3_600_000)
    }
}
