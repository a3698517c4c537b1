//! Authentication session and send-message workflow.
//!
//! - `AuthSession`: credentials, their persistence, and login/logout events
//! - `SendWorkflow`: gates outgoing messages on the anonymous limit and keeps
//!   the tracker's count accurate

pub mod auth;
pub mod workflow;

pub use auth::{AuthEvent, AuthSession};
pub use workflow::{Delivery, LimitCallback, SendOutcome, SendWorkflow};
