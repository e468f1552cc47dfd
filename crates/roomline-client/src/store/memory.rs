use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{CredentialStore, CredentialStoreError, StoredCredential};

/// In-memory credential store for tests and ephemeral sessions.
///
/// All state lives behind `Arc<Mutex<_>>`, so clones share it. A poisoned
/// lock surfaces as [`CredentialStoreError::Io`].
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<HashMap<String, StoredCredential>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record under `key`, including its write time.
    pub fn stored(&self, key: &str) -> Result<Option<StoredCredential>, CredentialStoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StoredCredential>>, CredentialStoreError> {
        self.inner.lock().map_err(|_| CredentialStoreError::Io("credential map poisoned".into()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        Ok(self.lock()?.get(key).map(|c| c.token.clone()))
    }

    fn store(&self, key: &str, token: &str) -> Result<(), CredentialStoreError> {
        self.lock()?.insert(key.to_string(), StoredCredential::now(token));
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
