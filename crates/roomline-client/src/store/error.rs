//! Credential store errors

use thiserror::Error;

/// Errors that can occur while reading or writing credentials
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialStoreError {
    /// Stored value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, lock)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<redb::DatabaseError> for CredentialStoreError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<redb::TransactionError> for CredentialStoreError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<redb::TableError> for CredentialStoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<redb::StorageError> for CredentialStoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<redb::CommitError> for CredentialStoreError {
    fn from(err: redb::CommitError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for CredentialStoreError {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<ciborium::de::Error<std::io::Error>> for CredentialStoreError {
    fn from(err: ciborium::de::Error<std::io::Error>) -> Self {
        Self::Serialization(err.to_string())
    }
}
