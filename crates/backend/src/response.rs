//! Backend response decoding and error mapping.
//!
//! Error bodies look like `{"detail": "..."}`; validation failures carry a
//! list in `detail` instead of a string.

use lexchat_core::{AuthErrorCode, Error, Result, SendErrorCode};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Extracts the human-readable detail from an error body.
pub fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Maps a non-success status and body to an error.
pub fn error_for_status(status: StatusCode, body: &str) -> Error {
    let detail = parse_detail(body).unwrap_or_else(|| {
        format!(
            "Backend returned {}",
            status.canonical_reason().unwrap_or(status.as_str())
        )
    });

    if status == StatusCode::UNAUTHORIZED {
        Error::auth(AuthErrorCode::TokenRejected, detail)
    } else {
        Error::send(SendErrorCode::Rejected, detail, Some(status.as_u16()))
    }
}

/// Decodes a JSON body, or maps the error status.
pub async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Backend returned error");
        return Err(error_for_status(status, &body));
    }

    response.json::<T>().await.map_err(|e| {
        warn!(error = %e, "Failed to parse backend response");
        Error::send(
            SendErrorCode::InvalidResponse,
            format!("Invalid backend response: {}", e),
            Some(status.as_u16()),
        )
    })
}

/// Maps a transport failure.
pub fn transport_error(err: reqwest::Error) -> Error {
    let msg = if err.is_timeout() {
        format!("Backend timed out: {}", err)
    } else {
        format!("Backend unavailable: {}", err)
    };
    Error::send(SendErrorCode::Unavailable, msg, None)
}
