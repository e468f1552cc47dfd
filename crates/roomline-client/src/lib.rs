//! Backend and credential store interfaces for roomline.
//!
//! The state machines in `roomline-core` never touch the network or disk.
//! This crate defines the two collaborators the runtime executes their
//! actions against:
//!
//! - [`Backend`]: connection events, authentication, document search and
//!   creation, realtime subscriptions
//! - [`CredentialStore`]: persistence of the single session token
//!
//! It also ships in-process implementations: [`MemoryBackend`] over a shared
//! [`MemoryRoom`], [`MemoryCredentialStore`] and the durable
//! [`RedbCredentialStore`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backend;
mod memory;
mod store;

pub use backend::{Backend, BackendError, BackendEvent, Credentials, LoginCredentials, RefreshedToken};
pub use memory::{DEFAULT_TOKEN_LIFETIME, MemoryBackend, MemoryRoom};
pub use store::{
    CredentialStore, CredentialStoreError, MemoryCredentialStore, RedbCredentialStore,
    StoredCredential,
};
