//! In-process backend.
//!
//! [`MemoryBackend`] implements [`Backend`] against a [`MemoryRoom`] living in
//! the same process. The CLI uses it as its server and tests use it to run
//! full sessions without a network.

mod room;

use std::time::Duration;

use roomline_core::{LOGIN_STRATEGY, SubscriptionId, TokenVerification};
use roomline_proto::{
    Collection, Document, Filter, NewMessage, Notification, Pagination, SearchQuery, SearchResult,
};
pub use room::{DEFAULT_TOKEN_LIFETIME, MemoryRoom};
use tokio::sync::mpsc;

use crate::{Backend, BackendError, BackendEvent, Credentials, LoginCredentials, RefreshedToken};

/// One client connection to a [`MemoryRoom`].
///
/// Holds its own active-credential slot and connectivity flag inside the
/// room. Dropping the backend releases its subscriptions.
pub struct MemoryBackend {
    room: MemoryRoom,
    client: u64,
    events: Option<mpsc::Receiver<BackendEvent>>,
}

impl MemoryBackend {
    /// Register a new client on `room`. Not connected until
    /// [`Backend::connect`].
    pub fn new(room: MemoryRoom) -> Self {
        let (client, events) = room.lock().register_client();
        Self { room, client, events: Some(events) }
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        self.room.lock().remove_client(self.client);
    }
}

impl Backend for MemoryBackend {
    async fn connect(&mut self) -> Result<(), BackendError> {
        let mut state = self.room.lock();
        if state.is_offline() {
            return Err(BackendError::Unavailable("server unreachable".into()));
        }

        let slot = state.client(self.client)?;
        slot.connected = true;
        if slot.events.try_send(BackendEvent::Connected).is_err() {
            tracing::debug!(client = self.client, "connected event not delivered");
        }
        tracing::debug!(client = self.client, "client connected");
        Ok(())
    }

    async fn disconnect(&mut self) {
        let mut state = self.room.lock();
        if let Ok(slot) = state.client(self.client) {
            slot.connected = false;
        }
        tracing::debug!(client = self.client, "client disconnected");
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<BackendEvent>> {
        self.events.take()
    }

    async fn login(
        &mut self,
        strategy: &str,
        credentials: &LoginCredentials,
    ) -> Result<String, BackendError> {
        if strategy != LOGIN_STRATEGY {
            return Err(BackendError::NotFound(format!("authentication strategy {strategy}")));
        }
        let token = random_id()?;

        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        let token = state.login(&credentials.username, &credentials.password, token)?;
        tracing::debug!(client = self.client, username = %credentials.username, "login accepted");
        Ok(token)
    }

    fn set_token(&mut self, token: Option<String>) {
        let mut state = self.room.lock();
        if let Ok(slot) = state.client(self.client) {
            slot.token = token;
        }
    }

    async fn check_token(&mut self) -> Result<TokenVerification, BackendError> {
        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        Ok(TokenVerification { valid: state.authenticated(self.client).is_some() })
    }

    async fn refresh_token(&mut self, expires_in: Duration) -> Result<RefreshedToken, BackendError> {
        let token = random_id()?;

        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        let username = state.require_user(self.client)?;
        state.issue(token.clone(), username, expires_in);
        state.client(self.client)?.token = Some(token.clone());

        Ok(RefreshedToken { token, expires_in })
    }

    async fn get_credentials(&mut self, strategy: &str) -> Result<Credentials, BackendError> {
        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        let username = state.require_user(self.client)?;
        if strategy != LOGIN_STRATEGY {
            return Err(BackendError::NotFound(format!("credentials for strategy {strategy}")));
        }
        Ok(Credentials { username })
    }

    async fn search(
        &mut self,
        collection: &Collection,
        query: &SearchQuery,
        pagination: Pagination,
    ) -> Result<SearchResult, BackendError> {
        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        state.require_user(self.client)?;
        Ok(state.search(collection, query, pagination))
    }

    async fn create(
        &mut self,
        collection: &Collection,
        body: &NewMessage,
    ) -> Result<Document, BackendError> {
        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        state.require_user(self.client)?;
        let document = state.create(collection, body.author.clone(), body.text.clone())?;
        tracing::debug!(client = self.client, id = %document.id, %collection, "document created");
        Ok(document)
    }

    async fn subscribe(
        &mut self,
        collection: &Collection,
        filter: &Filter,
    ) -> Result<(SubscriptionId, mpsc::Receiver<Notification>), BackendError> {
        let id = SubscriptionId(random_id()?);

        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        state.require_user(self.client)?;
        let receiver = state.subscribe(self.client, id.clone(), collection, filter);
        tracing::debug!(client = self.client, subscription = %id, %collection, "subscribed");
        Ok((id, receiver))
    }

    async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), BackendError> {
        let mut state = self.room.lock();
        state.ensure_reachable(self.client)?;
        state.unsubscribe(id)
    }
}

/// Random 128-bit identifier, hex encoded.
fn random_id() -> Result<String, BackendError> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes)
        .map_err(|e| BackendError::Unavailable(format!("random source failed: {e}")))?;
    Ok(hex::encode(bytes))
}
