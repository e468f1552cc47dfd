//! Realtime notifications.

use serde::{Deserialize, Serialize};

use crate::{Document, errors::Result};

/// Notification type for document changes.
pub const KIND_DOCUMENT: &str = "document";

/// Notification action for a newly created document.
pub const ACTION_CREATE: &str = "create";

/// A realtime push describing a change on a subscribed collection.
///
/// `kind` and `action` are kept as raw strings: the backend may grow new
/// notification types, and the client only reacts to document creations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification type (`"document"`, `"user"`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Action that triggered it (`"create"`, `"update"`, `"delete"`, ...).
    pub action: String,
    /// Document the notification is about.
    pub result: Document,
}

impl Notification {
    /// Notification announcing that `document` was created.
    pub fn created(document: Document) -> Self {
        Self { kind: KIND_DOCUMENT.to_string(), action: ACTION_CREATE.to_string(), result: document }
    }

    /// Whether this notification reports a newly created document.
    pub fn is_document_created(&self) -> bool {
        self.kind == KIND_DOCUMENT && self.action == ACTION_CREATE
    }

    /// Decode a notification from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
