//! Fault-injecting backend wrapper
//!
//! Backend wrapper that fails or delays operations to test error handling.
//! Failures are either scheduled per operation or drawn from a seeded RNG,
//! so chaos runs are reproducible.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roomline_client::{
    Backend, BackendError, BackendEvent, Credentials, LoginCredentials, RefreshedToken,
};
use roomline_core::{SubscriptionId, TokenVerification};
use roomline_proto::{
    Collection, Document, Filter, NewMessage, Notification, Pagination, SearchQuery, SearchResult,
};
use tokio::sync::mpsc;

/// Backend operations that can be targeted by faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::connect`]
    Connect,
    /// [`Backend::disconnect`]
    Disconnect,
    /// [`Backend::login`]
    Login,
    /// [`Backend::set_token`] (never fails)
    SetToken,
    /// [`Backend::check_token`]
    CheckToken,
    /// [`Backend::refresh_token`]
    RefreshToken,
    /// [`Backend::get_credentials`]
    GetCredentials,
    /// [`Backend::search`]
    Search,
    /// [`Backend::create`]
    Create,
    /// [`Backend::subscribe`]
    Subscribe,
    /// [`Backend::unsubscribe`]
    Unsubscribe,
}

/// One recorded backend call, with the arguments tests assert on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `connect`
    Connect,
    /// `disconnect`
    Disconnect,
    /// `login` as `username`
    Login {
        /// Username.
        username: String,
    },
    /// `set_token`
    SetToken(Option<String>),
    /// `check_token`
    CheckToken,
    /// `refresh_token` asking for `expires_in`
    RefreshToken {
        /// Requested lifetime.
        expires_in: Duration,
    },
    /// `get_credentials`
    GetCredentials,
    /// `search`
    Search(SearchQuery),
    /// `create` with `text`
    Create {
        /// Message text.
        text: String,
    },
    /// `subscribe`
    Subscribe,
    /// `unsubscribe`
    Unsubscribe(SubscriptionId),
}

impl Call {
    /// Operation this call belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Connect => Operation::Connect,
            Self::Disconnect => Operation::Disconnect,
            Self::Login { .. } => Operation::Login,
            Self::SetToken(_) => Operation::SetToken,
            Self::CheckToken => Operation::CheckToken,
            Self::RefreshToken { .. } => Operation::RefreshToken,
            Self::GetCredentials => Operation::GetCredentials,
            Self::Search(_) => Operation::Search,
            Self::Create { .. } => Operation::Create,
            Self::Subscribe => Operation::Subscribe,
            Self::Unsubscribe(_) => Operation::Unsubscribe,
        }
    }
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct FaultState {
    log: Vec<Call>,
    hooks: HashMap<Operation, VecDeque<Hook>>,
    scheduled: HashMap<Operation, VecDeque<BackendError>>,
    persistent: HashMap<Operation, BackendError>,
    delays: HashMap<Operation, Duration>,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Option<ChaCha8Rng>,
}

impl FaultState {
    /// Record `call` and decide its fate: an injected error, or the delay
    /// to apply before delegating.
    fn admit(&mut self, call: Call) -> Result<Option<Duration>, BackendError> {
        let operation = call.operation();
        self.log.push(call);

        if let Some(err) = self.scheduled.get_mut(&operation).and_then(VecDeque::pop_front) {
            tracing::debug!(?operation, error = %err, "injecting scheduled failure");
            return Err(err);
        }
        if let Some(err) = self.persistent.get(&operation) {
            return Err(err.clone());
        }
        let rate = self.failure_rate;
        if let Some(rng) = self.rng.as_mut()
            && rng.gen_bool(rate)
        {
            tracing::debug!(?operation, "injecting random failure");
            return Err(BackendError::Unavailable("chaotic failure injection".into()));
        }

        Ok(self.delays.get(&operation).copied())
    }
}

/// Control surface shared between a test and the [`FaultyBackend`] the
/// runtime owns. Clone is cheap (Arc).
#[derive(Clone, Default)]
pub struct FaultHandle {
    state: Arc<Mutex<FaultState>>,
}

impl FaultHandle {
    /// Fail the next call to `operation` with `error`. Calls queue up.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.lock().scheduled.entry(operation).or_default().push_back(error);
    }

    /// Fail every call to `operation` with `error` until [`FaultHandle::heal`].
    pub fn fail_always(&self, operation: Operation, error: BackendError) {
        self.lock().persistent.insert(operation, error);
    }

    /// Run `action` when `operation` is next called, before the call reaches
    /// the inner backend. Used to land server-side changes between two
    /// client calls.
    pub fn before(&self, operation: Operation, action: impl FnOnce() + Send + 'static) {
        self.lock().hooks.entry(operation).or_default().push_back(Box::new(action));
    }

    /// Remove scheduled and persistent failures and delays for `operation`.
    pub fn heal(&self, operation: Operation) {
        let mut state = self.lock();
        state.scheduled.remove(&operation);
        state.persistent.remove(&operation);
        state.delays.remove(&operation);
    }

    /// Delay every call to `operation` by `delay` before delegating.
    pub fn delay(&self, operation: Operation, delay: Duration) {
        self.lock().delays.insert(operation, delay);
    }

    /// Fail any fallible call with probability `failure_rate`, drawn from an
    /// RNG seeded with `seed`.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn chaos(&self, failure_rate: f64, seed: u64) {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );
        let mut state = self.lock();
        state.failure_rate = failure_rate;
        state.rng = Some(ChaCha8Rng::seed_from_u64(seed));
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().log.clone()
    }

    /// Number of calls to `operation` so far.
    pub fn count(&self, operation: Operation) -> usize {
        self.lock().log.iter().filter(|c| c.operation() == operation).count()
    }

    fn lock(&self) -> MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn admit(&self, call: Call) -> Result<(), BackendError> {
        // Hooks run and delays elapse without the guard held.
        let hook = self.lock().hooks.get_mut(&call.operation()).and_then(VecDeque::pop_front);
        if let Some(hook) = hook {
            hook();
        }
        let delay = self.lock().admit(call)?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Backend wrapper that records calls and injects failures and delays.
pub struct FaultyBackend<B: Backend> {
    inner: B,
    handle: FaultHandle,
}

impl<B: Backend> FaultyBackend<B> {
    /// Wrap `inner`. No faults are active until configured.
    pub fn new(inner: B) -> Self {
        Self { inner, handle: FaultHandle::default() }
    }

    /// Control handle. Keep a clone before handing the backend to a runtime.
    pub fn handle(&self) -> FaultHandle {
        self.handle.clone()
    }

    /// Underlying backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Backend> Backend for FaultyBackend<B> {
    async fn connect(&mut self) -> Result<(), BackendError> {
        self.handle.admit(Call::Connect).await?;
        self.inner.connect().await
    }

    async fn disconnect(&mut self) {
        // Disconnect cannot fail; only delays apply.
        let _ = self.handle.admit(Call::Disconnect).await;
        self.inner.disconnect().await;
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<BackendEvent>> {
        self.inner.take_events()
    }

    async fn login(
        &mut self,
        strategy: &str,
        credentials: &LoginCredentials,
    ) -> Result<String, BackendError> {
        self.handle.admit(Call::Login { username: credentials.username.clone() }).await?;
        self.inner.login(strategy, credentials).await
    }

    fn set_token(&mut self, token: Option<String>) {
        self.handle.lock().log.push(Call::SetToken(token.clone()));
        self.inner.set_token(token);
    }

    async fn check_token(&mut self) -> Result<TokenVerification, BackendError> {
        self.handle.admit(Call::CheckToken).await?;
        self.inner.check_token().await
    }

    async fn refresh_token(&mut self, expires_in: Duration) -> Result<RefreshedToken, BackendError> {
        self.handle.admit(Call::RefreshToken { expires_in }).await?;
        self.inner.refresh_token(expires_in).await
    }

    async fn get_credentials(&mut self, strategy: &str) -> Result<Credentials, BackendError> {
        self.handle.admit(Call::GetCredentials).await?;
        self.inner.get_credentials(strategy).await
    }

    async fn search(
        &mut self,
        collection: &Collection,
        query: &SearchQuery,
        pagination: Pagination,
    ) -> Result<SearchResult, BackendError> {
        self.handle.admit(Call::Search(query.clone())).await?;
        self.inner.search(collection, query, pagination).await
    }

    async fn create(
        &mut self,
        collection: &Collection,
        body: &NewMessage,
    ) -> Result<Document, BackendError> {
        self.handle.admit(Call::Create { text: body.text.clone() }).await?;
        self.inner.create(collection, body).await
    }

    async fn subscribe(
        &mut self,
        collection: &Collection,
        filter: &Filter,
    ) -> Result<(SubscriptionId, mpsc::Receiver<Notification>), BackendError> {
        self.handle.admit(Call::Subscribe).await?;
        self.inner.subscribe(collection, filter).await
    }

    async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<(), BackendError> {
        self.handle.admit(Call::Unsubscribe(id.clone())).await?;
        self.inner.unsubscribe(id).await
    }
}
