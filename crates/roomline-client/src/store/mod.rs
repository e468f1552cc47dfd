//! Credential persistence.
//!
//! The trait is synchronous. A token is a few dozen bytes and is read once
//! per connection, so stores are called directly from the runtime task.

mod error;
mod memory;
mod redb;

pub use error::CredentialStoreError;
pub use memory::MemoryCredentialStore;
use serde::{Deserialize, Serialize};

pub use self::redb::RedbCredentialStore;

/// Persisted form of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Opaque session token.
    pub token: String,
    /// Unix timestamp (seconds) of the write.
    pub stored_at_secs: u64,
}

impl StoredCredential {
    /// Wrap `token`, stamped with the current wall-clock time.
    pub fn now(token: impl Into<String>) -> Self {
        let stored_at_secs = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        Self { token: token.into(), stored_at_secs }
    }
}

/// Key/value persistence for session tokens.
///
/// Must be Clone (the runtime and tests may hold handles to the same store),
/// Send + Sync, and synchronous. Clones share the underlying storage.
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Load the token stored under `key`. `None` if nothing is stored.
    fn load(&self, key: &str) -> Result<Option<String>, CredentialStoreError>;

    /// Store `token` under `key`, replacing any previous value.
    fn store(&self, key: &str, token: &str) -> Result<(), CredentialStoreError>;

    /// Remove the value under `key`. Removing an absent key is not an error.
    fn clear(&self, key: &str) -> Result<(), CredentialStoreError>;
}
