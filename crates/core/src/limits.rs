//! Usage and size limits.
//!
//! The anonymous message limit and reset window are defaults for
//! `TrackerConfig`; deployments override them through configuration.
//!
//! # Usage Note
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so `MAX_MESSAGE_CHARS` is duplicated on `ChatRequest`. Keep both in sync
//! when modifying.

// === Anonymous Usage ===

/// Messages an anonymous session may send per window.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 5;

/// Hours after the last anonymous message before the counter resets.
pub const DEFAULT_RESET_WINDOW_HOURS: i64 = 24;

// === Message Limits ===

/// Maximum message text length (chars).
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// Maximum attachments referenced by one message.
pub const MAX_ATTACHMENTS: usize = 10;

// === Backend Client ===

/// Default HTTP request timeout (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// TTL for cached chat history and shared chats (seconds).
pub const HISTORY_CACHE_TTL_SECS: u64 = 30;

/// Maximum cached chats.
pub const HISTORY_CACHE_MAX_CAPACITY: u64 = 1_000;
