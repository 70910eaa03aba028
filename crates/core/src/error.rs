//! Error types for fireman
//!
//! This module defines all error types used throughout the client.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! | Variant | Raised by | Retried |
//! |---------|-----------|---------|
//! | `TimestampOutOfRange` | key codec (encode) | never |
//! | `InvalidKey` | key codec (decode), cursor successor | never |
//! | `IteratorBusy` | page iterator re-entry | never |
//! | `Transport` | backends | yes, by the retry primitive |
//! | `Operation` | caller-supplied per-item work | never |

use std::io;
use thiserror::Error;

/// Result type alias for fireman operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the fireman client
#[derive(Debug, Error)]
pub enum Error {
    /// Timestamp does not fit in the 48 bits a key can carry
    #[error("timestamp out of range: {timestamp} (expected 0..=281474976710655)")]
    TimestampOutOfRange {
        /// The rejected timestamp in milliseconds
        timestamp: i64,
    },

    /// Key cannot be decoded
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// Page iterator re-entered while a fetch is outstanding
    #[error("iterator busy: a page fetch is already in flight")]
    IteratorBusy,

    /// Network or service failure talking to the database
    #[error("transport error{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status code, when the service answered
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Caller-supplied operation failed
    #[error("operation failed: {0}")]
    Operation(String),

    /// Fetched data does not have the expected shape
    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),

    /// Query combination the service would reject
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (rules files, local database file)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Create a transport error without an HTTP status
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            status: None,
            reason: reason.into(),
        }
    }

    /// Create an error for a failed caller-supplied operation
    pub fn operation(reason: impl Into<String>) -> Self {
        Error::Operation(reason.into())
    }

    /// Create an invalid-key error
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_timestamp_out_of_range() {
        let err = Error::TimestampOutOfRange { timestamp: -1 };
        let msg = err.to_string();
        assert!(msg.contains("timestamp out of range"));
        assert!(msg.contains("-1"));
    }

    #[test]
    fn test_error_display_invalid_key() {
        let err = Error::invalid_key("abc", "too short");
        let msg = err.to_string();
        assert!(msg.contains("invalid key"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("too short"));
    }

    #[test]
    fn test_error_display_transport_with_status() {
        let err = Error::Transport {
            status: Some(503),
            reason: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transport error (HTTP 503): service unavailable"
        );
    }

    #[test]
    fn test_error_display_transport_without_status() {
        let err = Error::transport("connection refused");
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "rules.json");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: Result<serde_json::Value> =
            serde_json::from_str("{not json").map_err(Error::from);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
