//! Redb-backed credential store.
//!
//! Tokens survive process restarts. Redb's copy-on-write transactions keep
//! the file consistent if the process dies mid-write.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};

use super::{CredentialStore, CredentialStoreError, StoredCredential};

/// Table: credentials
/// Key: credential name (e.g. `"jwt"`)
/// Value: CBOR-encoded StoredCredential
const CREDENTIALS: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");

/// Durable credential store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbCredentialStore {
    db: Arc<Database>,
}

impl RedbCredentialStore {
    /// Open or create a database at `path`, creating the credentials table.
    ///
    /// # Errors
    ///
    /// Returns `CredentialStoreError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialStoreError> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(CREDENTIALS)?;
        }
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Stored record under `key`, including its write time.
    pub fn stored(&self, key: &str) -> Result<Option<StoredCredential>, CredentialStoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CREDENTIALS)?;

        match table.get(key)? {
            Some(value) => Ok(Some(ciborium::from_reader(value.value())?)),
            None => Ok(None),
        }
    }
}

impl CredentialStore for RedbCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        Ok(self.stored(key)?.map(|c| c.token))
    }

    fn store(&self, key: &str, token: &str) -> Result<(), CredentialStoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(&StoredCredential::now(token), &mut bytes)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CREDENTIALS)?;
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;

        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), CredentialStoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CREDENTIALS)?;
            table.remove(key)?;
        }
        txn.commit()?;

        Ok(())
    }
}
