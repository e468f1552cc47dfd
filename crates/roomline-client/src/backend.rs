//! Backend trait for the chat server.
//!
//! The [`Backend`] trait decouples the runtime from a specific server SDK.
//! Methods mirror the calls the session and chat machines need; every
//! failure is a [`BackendError`] so the runtime can turn it into the
//! matching failure event.

use std::{future::Future, time::Duration};

use roomline_core::{SubscriptionId, TokenVerification};
use roomline_proto::{
    Collection, Document, Filter, NewMessage, Notification, Pagination, SearchQuery, SearchResult,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// Connectivity and session events pushed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// First connection established.
    Connected,
    /// Connection re-established after a loss.
    Reconnected,
    /// Connection lost. The backend reconnects on its own.
    Disconnected,
    /// The active token expired.
    TokenExpired,
}

/// Errors returned by backend calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Server unreachable or connection lost.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Missing, invalid or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Server refused the request.
    #[error("{0}")]
    Rejected(String),

    /// No answer within the call timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Username and password for the `local` strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Credentials the server holds for the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
}

/// Token issued by a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// New token.
    pub token: String,
    /// Lifetime granted by the server.
    pub expires_in: Duration,
}

/// Abstracts the chat server.
///
/// One instance belongs to one runtime, so methods take `&mut self`.
/// Implementations keep an active-credential slot: [`Backend::set_token`]
/// assigns it and every authenticated call uses it.
///
/// # Implementations
///
/// - [`crate::MemoryBackend`]: in-process server shared through a
///   [`crate::MemoryRoom`]
/// - `FaultyBackend` (roomline-harness): failure injection wrapper
pub trait Backend: Send {
    /// Open the connection. Success is also reported as
    /// [`BackendEvent::Connected`] on the event stream.
    fn connect(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Close the connection.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    /// Take the connectivity event stream. Returns `None` after the first
    /// call.
    fn take_events(&mut self) -> Option<mpsc::Receiver<BackendEvent>>;

    /// Authenticate and return a new session token.
    ///
    /// Does not assign the token to the credential slot.
    fn login(
        &mut self,
        strategy: &str,
        credentials: &LoginCredentials,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;

    /// Assign the active credential. `None` clears it.
    fn set_token(&mut self, token: Option<String>);

    /// Check whether the active credential is valid.
    ///
    /// An absent or unknown token is reported as invalid, not as an error.
    fn check_token(&mut self) -> impl Future<Output = Result<TokenVerification, BackendError>> + Send;

    /// Exchange the active credential for one valid for `expires_in`.
    ///
    /// The new token becomes the active credential.
    fn refresh_token(
        &mut self,
        expires_in: Duration,
    ) -> impl Future<Output = Result<RefreshedToken, BackendError>> + Send;

    /// Credentials of the authenticated user for `strategy`.
    fn get_credentials(
        &mut self,
        strategy: &str,
    ) -> impl Future<Output = Result<Credentials, BackendError>> + Send;

    /// Search documents in `collection`.
    fn search(
        &mut self,
        collection: &Collection,
        query: &SearchQuery,
        pagination: Pagination,
    ) -> impl Future<Output = Result<SearchResult, BackendError>> + Send;

    /// Create a document. The server assigns its id and timestamps.
    fn create(
        &mut self,
        collection: &Collection,
        body: &NewMessage,
    ) -> impl Future<Output = Result<Document, BackendError>> + Send;

    /// Subscribe to changes in `collection` matching `filter`.
    ///
    /// Notifications arrive on the returned receiver until
    /// [`Backend::unsubscribe`] is called.
    fn subscribe(
        &mut self,
        collection: &Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<(SubscriptionId, mpsc::Receiver<Notification>), BackendError>> + Send;

    /// Release a subscription.
    fn unsubscribe(
        &mut self,
        id: &SubscriptionId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
