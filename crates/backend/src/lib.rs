//! Client for the chatbot backend.
//!
//! `ChatBackend` and `AuthBackend` are the seams the workflow depends on;
//! `HttpBackend` implements both over HTTP.

pub mod backend;
pub mod client;
pub mod config;
pub mod response;

pub use backend::{AuthBackend, ChatBackend};
pub use client::HttpBackend;
pub use config::BackendConfig;
