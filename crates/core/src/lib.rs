//! Core types, storage port, and anonymous usage tracking for lexchat.

pub mod auth;
pub mod chat;
pub mod clock;
pub mod error;
pub mod limits;
pub mod session;
pub mod storage;
pub mod tracker;

pub use auth::*;
pub use chat::*;
pub use clock::*;
pub use error::{
    AuthErrorCode, Error, Result, SendErrorCode, StoreErrorCode, ValidationErrorCode,
};
pub use session::*;
pub use storage::{apply_ops, Entries, KeyValueStore, MemoryStore, SharedStore, StoreOp};
pub use tracker::*;
