//! Unified error types for lexchat.
//!
//! Error codes:
//! - AUTH_001-004: Authentication errors
//! - VALID_001-003: Validation errors
//! - SEND_001-003: Backend send errors
//! - STORE_001-002: Persistence errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: No credentials present
    NotAuthenticated,
    /// AUTH_002: Backend rejected username/password
    InvalidCredentials,
    /// AUTH_003: Access token expired or rejected
    TokenRejected,
    /// AUTH_004: Refresh token exchange failed
    RefreshFailed,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "AUTH_001",
            Self::InvalidCredentials => "AUTH_002",
            Self::TokenRejected => "AUTH_003",
            Self::RefreshFailed => "AUTH_004",
        }
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Message has no text and no attachments
    EmptyMessage,
    /// VALID_002: Malformed input (credentials, ids)
    InvalidFormat,
    /// VALID_003: Message text exceeds the size limit
    MessageTooLong,
}

impl ValidationErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "VALID_001",
            Self::InvalidFormat => "VALID_002",
            Self::MessageTooLong => "VALID_003",
        }
    }
}

/// Backend send error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorCode {
    /// SEND_001: Backend unreachable (network, timeout)
    Unavailable,
    /// SEND_002: Backend returned a non-success status
    Rejected,
    /// SEND_003: Backend response could not be decoded
    InvalidResponse,
}

impl SendErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "SEND_001",
            Self::Rejected => "SEND_002",
            Self::InvalidResponse => "SEND_003",
        }
    }
}

/// Persistence error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Storage could not be read or written
    Unavailable,
    /// STORE_002: Stored data is corrupt
    Corrupt,
}

impl StoreErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "STORE_001",
            Self::Corrupt => "STORE_002",
        }
    }
}

/// Unified error type for lexchat.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication error with code.
    #[error("[{code}] {message}")]
    Auth { code: &'static str, message: String },

    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode { code: &'static str, message: String },

    /// Backend send error with code and optional HTTP status.
    #[error("[{code}] {message}")]
    Send {
        code: &'static str,
        message: String,
        status: Option<u16>,
    },

    /// Persistence error with code.
    #[error("[{code}] {message}")]
    Store { code: &'static str, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an authentication error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Auth {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a backend send error.
    pub fn send(code: SendErrorCode, msg: impl Into<String>, status: Option<u16>) -> Self {
        Self::Send {
            code: code.code(),
            message: msg.into(),
            status,
        }
    }

    /// Create a persistence error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Auth { code, .. } => Some(code),
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::Send { code, .. } => Some(code),
            Self::Store { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the backend rejected the access token.
    pub fn is_token_rejected(&self) -> bool {
        self.error_code() == Some(AuthErrorCode::TokenRejected.code())
    }

    /// HTTP status reported by the backend, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Send { status, .. } => *status,
            Self::Auth { code, .. } if *code == AuthErrorCode::TokenRejected.code() => Some(401),
            _ => None,
        }
    }
}
