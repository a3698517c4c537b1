//! Authentication types.
//!
//! This module provides:
//! - Login/registration request types with input validation
//! - Token pairs returned by the backend
//! - Stored credentials and the bearer header they produce

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};

/// Header carrying the anonymous session id on every chat request.
pub const ANONYMOUS_SESSION_HEADER: &str = "X-Anonymous-Session-Id";

/// Login form fields (`multipart/form-data`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Registration body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Refresh body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens issued by login, registration, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Credentials held by an authenticated client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn from_tokens(email: impl Into<String>, tokens: TokenPair) -> Self {
        Self {
            email: email.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Identity attached to an outgoing backend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAuth {
    /// Anonymous session id, sent whether or not a token is present
    pub session_id: String,
    /// Access token when the user is logged in
    pub access_token: Option<String>,
}

impl RequestAuth {
    pub fn anonymous(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            access_token: None,
        }
    }

    pub fn authenticated(session_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            access_token: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Runs derive validation and maps failures to a coded error.
pub fn validate_input<T: Validate>(input: &T) -> Result<()> {
    input.validate().map_err(|e| {
        Error::validation_code(ValidationErrorCode::InvalidFormat, e.to_string())
    })
}
