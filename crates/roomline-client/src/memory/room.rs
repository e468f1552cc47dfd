//! Shared server state for the in-process backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use roomline_core::SubscriptionId;
use roomline_proto::{
    Collection, Document, Filter, MessageBody, Metadata, Notification, Pagination, SearchQuery,
    SearchResult,
};
use tokio::sync::mpsc;

use crate::{BackendError, BackendEvent};

/// Lifetime of tokens issued by login.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Buffer of every per-client channel.
pub(crate) const CHANNEL_CAPACITY: usize = 256;

/// In-process chat server shared by any number of [`crate::MemoryBackend`]s.
///
/// Holds accounts, issued tokens, documents per collection and realtime
/// subscriptions. Clones share the same server. Test code drives
/// connectivity and token lifetime through [`MemoryRoom::disconnect`],
/// [`MemoryRoom::reconnect`] and [`MemoryRoom::expire_tokens`].
#[derive(Clone, Default)]
pub struct MemoryRoom {
    inner: Arc<Mutex<RoomState>>,
}

#[derive(Default)]
pub(crate) struct RoomState {
    offline: bool,
    accounts: HashMap<String, String>,
    tokens: HashMap<String, IssuedToken>,
    collections: HashMap<Collection, Vec<Document>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    clients: HashMap<u64, ClientSlot>,
    next_client: u64,
    last_created_at: i64,
}

struct IssuedToken {
    username: String,
    expires_at: Instant,
    revoked: bool,
}

struct Subscription {
    client: u64,
    collection: Collection,
    filter: Filter,
    sender: mpsc::Sender<Notification>,
}

pub(crate) struct ClientSlot {
    pub(crate) events: mpsc::Sender<BackendEvent>,
    pub(crate) connected: bool,
    pub(crate) token: Option<String>,
}

impl MemoryRoom {
    /// Create an empty, reachable server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account for the `local` strategy.
    pub fn add_account(&self, username: impl Into<String>, password: impl Into<String>) {
        self.lock().accounts.insert(username.into(), password.into());
    }

    /// Make the server unreachable and tell every connected client.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        state.offline = true;
        state.broadcast(BackendEvent::Disconnected);
    }

    /// Make the server reachable again and tell every client that was
    /// connected.
    pub fn reconnect(&self) {
        let mut state = self.lock();
        state.offline = false;
        state.broadcast(BackendEvent::Reconnected);
    }

    /// Issue `token` for `username` directly, as if a login had happened in
    /// an earlier session.
    pub fn issue_token(
        &self,
        token: impl Into<String>,
        username: impl Into<String>,
        lifetime: Duration,
    ) {
        self.lock().issue(token.into(), username.into(), lifetime);
    }

    /// Revoke every issued token and notify clients holding one.
    pub fn expire_tokens(&self) {
        let mut state = self.lock();
        for token in state.tokens.values_mut() {
            token.revoked = true;
        }

        let expired: Vec<_> = state
            .clients
            .values()
            .filter(|c| c.connected && c.token.is_some())
            .map(|c| c.events.clone())
            .collect();
        for events in expired {
            send_event(&events, BackendEvent::TokenExpired);
        }
    }

    /// Create a message as `author` without going through a client.
    ///
    /// Subscribers are notified as for a client-created message.
    pub fn insert_message(
        &self,
        collection: &Collection,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Document, BackendError> {
        self.lock().create(collection, author.into(), text.into())
    }

    /// Every document in `collection`, in creation order.
    pub fn documents(&self, collection: &Collection) -> Vec<Document> {
        self.lock().collections.get(collection).cloned().unwrap_or_default()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// A poisoned lock still holds consistent state: every mutation below
    /// completes before anything can panic.
    pub(crate) fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RoomState {
    pub(crate) fn register_client(&mut self) -> (u64, mpsc::Receiver<BackendEvent>) {
        let (events, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let id = self.next_client;
        self.next_client += 1;
        self.clients.insert(id, ClientSlot { events, connected: false, token: None });
        (id, receiver)
    }

    pub(crate) fn remove_client(&mut self, client: u64) {
        self.clients.remove(&client);
        self.subscriptions.retain(|_, s| s.client != client);
    }

    pub(crate) fn client(&mut self, client: u64) -> Result<&mut ClientSlot, BackendError> {
        self.clients
            .get_mut(&client)
            .ok_or_else(|| BackendError::Unavailable("client not registered".into()))
    }

    pub(crate) fn is_offline(&self) -> bool {
        self.offline
    }

    /// Fails unless the server is reachable and `client` is connected.
    pub(crate) fn ensure_reachable(&mut self, client: u64) -> Result<(), BackendError> {
        if self.offline {
            return Err(BackendError::Unavailable("server unreachable".into()));
        }
        if !self.client(client)?.connected {
            return Err(BackendError::Unavailable("not connected".into()));
        }
        Ok(())
    }

    pub(crate) fn login(
        &mut self,
        username: &str,
        password: &str,
        token: String,
    ) -> Result<String, BackendError> {
        match self.accounts.get(username) {
            Some(expected) if expected == password => {
                self.issue(token.clone(), username.to_string(), DEFAULT_TOKEN_LIFETIME);
                Ok(token)
            },
            _ => Err(BackendError::Unauthorized("wrong username or password".into())),
        }
    }

    pub(crate) fn issue(&mut self, token: String, username: String, lifetime: Duration) {
        let expires_at = Instant::now() + lifetime;
        self.tokens.insert(token, IssuedToken { username, expires_at, revoked: false });
    }

    /// Username owning the client's active token, if that token is live.
    pub(crate) fn authenticated(&mut self, client: u64) -> Option<String> {
        let token = self.client(client).ok()?.token.clone()?;
        self.tokens
            .get(&token)
            .filter(|t| !t.revoked && t.expires_at > Instant::now())
            .map(|t| t.username.clone())
    }

    pub(crate) fn require_user(&mut self, client: u64) -> Result<String, BackendError> {
        self.authenticated(client)
            .ok_or_else(|| BackendError::Unauthorized("invalid or expired token".into()))
    }

    pub(crate) fn search(
        &self,
        collection: &Collection,
        query: &SearchQuery,
        pagination: Pagination,
    ) -> SearchResult {
        let mut hits: Vec<_> = self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();
        hits.sort_by(|a, b| query.compare(a, b));

        let total = hits.len();
        let hits = hits.into_iter().skip(pagination.from).take(pagination.size).collect();
        SearchResult { hits, total }
    }

    pub(crate) fn create(
        &mut self,
        collection: &Collection,
        author: String,
        text: String,
    ) -> Result<Document, BackendError> {
        let created_at = chrono::Utc::now().timestamp_millis().max(self.last_created_at + 1);
        self.last_created_at = created_at;

        let document = Document {
            id: super::random_id()?,
            source: MessageBody {
                author,
                text,
                metadata: Some(Metadata { created_at, updated_at: None }),
            },
        };
        self.collections.entry(collection.clone()).or_default().push(document.clone());
        self.fan_out(collection, &document);

        Ok(document)
    }

    pub(crate) fn subscribe(
        &mut self,
        client: u64,
        id: SubscriptionId,
        collection: &Collection,
        filter: &Filter,
    ) -> mpsc::Receiver<Notification> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscriptions.insert(id, Subscription {
            client,
            collection: collection.clone(),
            filter: filter.clone(),
            sender,
        });
        receiver
    }

    pub(crate) fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), BackendError> {
        self.subscriptions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("subscription {id}")))
    }

    fn fan_out(&mut self, collection: &Collection, document: &Document) {
        let notification = Notification::created(document.clone());
        self.subscriptions.retain(|id, sub| {
            if sub.collection != *collection || !sub.filter.matches(document) {
                return true;
            }
            match sub.sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(subscription = %id, "subscriber lagging, notification dropped");
                    true
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(subscription = %id, "subscriber gone");
                    false
                },
            }
        });
    }

    fn broadcast(&self, event: BackendEvent) {
        for client in self.clients.values().filter(|c| c.connected) {
            send_event(&client.events, event);
        }
    }
}

fn send_event(events: &mpsc::Sender<BackendEvent>, event: BackendEvent) {
    if let Err(e) = events.try_send(event) {
        tracing::debug!(?event, error = %e, "connectivity event not delivered");
    }
}
