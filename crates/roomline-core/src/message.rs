//! Chat messages.

use chrono::{DateTime, Utc};
use roomline_proto::{Document, ProtocolError};

/// Display format for message timestamps (UTC).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A chat entry.
///
/// Immutable once created. Ordered in the room by `created_at`, which the
/// server assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Backend-assigned unique identifier.
    pub id: String,
    /// Username of the sender.
    pub author: String,
    /// Message text.
    pub text: String,
    /// Server creation time.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a message from a stored document.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MissingTimestamp` if the document has no metadata
    /// - `ProtocolError::InvalidTimestamp` if the timestamp is out of range
    pub fn from_document(document: &Document) -> Result<Self, ProtocolError> {
        let millis = document
            .created_at_millis()
            .ok_or_else(|| ProtocolError::MissingTimestamp { id: document.id.clone() })?;

        let created_at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| ProtocolError::InvalidTimestamp { id: document.id.clone(), millis })?;

        Ok(Self {
            id: document.id.clone(),
            author: document.source.author.clone(),
            text: document.source.text.clone(),
            created_at,
        })
    }

    /// Creation time formatted for display.
    pub fn date(&self) -> String {
        self.created_at.format(DATE_FORMAT).to_string()
    }

    /// Creation time in epoch milliseconds.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Whether `username` wrote this message.
    pub fn is_from(&self, username: Option<&str>) -> bool {
        username == Some(self.author.as_str())
    }
}
