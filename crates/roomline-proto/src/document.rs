//! Message documents as stored by the backend.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A message document returned by search, create, or a notification.
///
/// Field names follow the backend's JSON layout (`_id`, `_source`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Backend-assigned unique identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Document body.
    #[serde(rename = "_source")]
    pub source: MessageBody,
}

impl Document {
    /// Decode a document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the document as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Server creation time in epoch milliseconds. `None` if the backend
    /// attached no metadata.
    pub fn created_at_millis(&self) -> Option<i64> {
        self.source.metadata.as_ref().map(|m| m.created_at)
    }
}

/// Body of a stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Username of the sender.
    pub author: String,
    /// Message text.
    pub text: String,
    /// Server-maintained metadata. Absent on bodies that were never stored.
    #[serde(rename = "_kuzzle_info", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Server-maintained document metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Creation time in epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    /// Last update time in epoch milliseconds, if ever updated.
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Body posted when creating a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Message text.
    pub text: String,
    /// Username of the sender.
    pub author: String,
}
