//! Error types for pagesync.
//!
//! This module defines the centralized error type [`PagesyncError`] and a type alias
//! [`Result`] for convenient error handling throughout the crate. All errors are
//! implemented using the `thiserror` crate for automatic `Error` trait implementation.
//!
//! Fetch failures never propagate past a list binding. They are reduced to a
//! human-readable string with [`PagesyncError::user_message`] and surfaced through
//! the snapshot's `error` field.

use thiserror::Error;

/// Message shown when a failure carries no usable description.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// The main error type for pagesync operations.
///
/// Fetch-related variants (`Transport`, `Service`, `MissingValue`) are recovered at
/// the coordinator boundary. The remaining variants are returned from setup code
/// (configuration loading, binding construction).
///
/// # Examples
///
/// ```
/// use pagesync::PagesyncError;
///
/// let err = PagesyncError::Service("Family not found".to_string());
/// assert_eq!(err.user_message(), "Family not found");
/// ```
#[derive(Debug, Clone, Error)]
pub enum PagesyncError {
    /// The network call itself failed (connection refused, timeout, non-2xx status).
    ///
    /// `body` holds the decoded response body when the server sent one. Its nested
    /// `message` takes priority over `message` when building a user-facing string.
    #[error("Transport error: {message}")]
    Transport {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Low-level failure description.
        message: String,
        /// Decoded response body, if any.
        body: Option<serde_json::Value>,
    },

    /// The service answered with `isSuccess: false`.
    ///
    /// Treated identically to a transport failure by the coordinator.
    #[error("Service error: {0}")]
    Service(String),

    /// The service answered with `isSuccess: true` but no value.
    #[error("Service response is missing its value")]
    MissingValue,

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Decoding of a JSON or TOML document failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Filesystem operation failed.
    ///
    /// Stored as a message so the error stays `Clone`; fetch outcomes are fanned
    /// out to both the coordinator and the store.
    #[error("IO error: {0}")]
    Io(String),

    /// A binding was created outside an async runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<std::io::Error> for PagesyncError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PagesyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl PagesyncError {
    /// Builds a transport error with only a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Returns the message to surface to rendering.
    ///
    /// Extraction order for transport failures:
    /// 1. `body.message` (string)
    /// 2. `body.error.message` (string)
    /// 3. the error's own message
    /// 4. [`FALLBACK_MESSAGE`]
    ///
    /// Empty strings count as absent at every step.
    #[must_use]
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Transport { message, body, .. } => body
                .as_ref()
                .and_then(nested_message)
                .unwrap_or(message.as_str()),
            Self::Service(message) => message.as_str(),
            other => return other.to_string(),
        };

        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }
}

fn nested_message(body: &serde_json::Value) -> Option<&str> {
    body.get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .filter(|m| !m.trim().is_empty())
        })
}

/// A specialized `Result` type for pagesync operations.
pub type Result<T> = std::result::Result<T, PagesyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_prefers_nested_body_message() {
        let err = PagesyncError::Transport {
            status: Some(400),
            message: "Request failed with status code 400".to_string(),
            body: Some(json!({ "message": "Invalid family id" })),
        };
        assert_eq!(err.user_message(), "Invalid family id");
    }

    #[test]
    fn transport_reads_error_envelope_in_body() {
        let err = PagesyncError::Transport {
            status: Some(500),
            message: "boom".to_string(),
            body: Some(json!({ "isSuccess": false, "error": { "message": "Database offline" } })),
        };
        assert_eq!(err.user_message(), "Database offline");
    }

    #[test]
    fn transport_falls_back_to_own_message_then_generic() {
        let err = PagesyncError::Transport {
            status: None,
            message: "connection reset".to_string(),
            body: Some(json!({ "message": "" })),
        };
        assert_eq!(err.user_message(), "connection reset");

        let err = PagesyncError::transport("");
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn service_message_is_verbatim() {
        assert_eq!(PagesyncError::Service("No access".into()).user_message(), "No access");
        assert_eq!(PagesyncError::Service("  ".into()).user_message(), FALLBACK_MESSAGE);
    }
}
