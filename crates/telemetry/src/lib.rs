//! Telemetry for lexchat.
//!
//! Structured logging through `tracing`, plus in-process counters and
//! component health that the CLI reports in `lexchat status`.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
