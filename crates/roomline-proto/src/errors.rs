//! Errors raised while decoding backend payloads.

use thiserror::Error;

/// Result alias for payload decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur when interpreting backend payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload was not valid JSON for the expected shape
    #[error("malformed payload: {0}")]
    Json(String),

    /// Document carries no server metadata, so it has no creation time
    #[error("document {id} has no creation timestamp")]
    MissingTimestamp {
        /// Document that lacks metadata
        id: String,
    },

    /// Creation timestamp cannot be represented as a calendar time
    #[error("document {id} has out-of-range timestamp {millis}")]
    InvalidTimestamp {
        /// Offending document
        id: String,
        /// Raw epoch milliseconds
        millis: i64,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
