//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: session and chat state machines
//! - [`Backend`]: the chat server
//! - [`CredentialStore`]: persisted session token
//! - [`Driver`]: presentation I/O
//!
//! It is the only writer of the [`App`]. Backend events, notifications and
//! intents are applied one at a time; each resulting action chain runs to
//! completion before the next input is taken.

use std::{collections::VecDeque, future::Future, time::Duration};

use roomline_client::{Backend, BackendError, BackendEvent, CredentialStore, LoginCredentials};
use roomline_core::{
    ChatAction, ChatEvent, LOGIN_STRATEGY, Notice, SessionAction, SessionEvent, Severity,
    SubscriptionId,
};
use roomline_proto::{Filter, NewMessage, Notification, Pagination, SearchQuery};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{App, AppAction, AppEvent, Driver, Intent, RuntimeConfig};

/// Errors that stop the runtime.
///
/// Backend and store failures never appear here: they become notices.
#[derive(Error, Debug)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// The driver could not render, notify or read input.
    #[error("driver error: {0}")]
    Driver(#[source] E),
}

/// One input taken by the event loop.
enum Input<E> {
    Backend(Option<BackendEvent>),
    Notification(Option<Notification>),
    Intent(Result<Option<Intent>, E>),
}

/// Generic runtime that orchestrates App, Backend, CredentialStore and Driver.
///
/// # Type Parameters
///
/// - `B`: chat server
/// - `S`: credential store
/// - `D`: presentation driver
pub struct Runtime<B, S, D>
where
    B: Backend,
    S: CredentialStore,
    D: Driver,
{
    backend: B,
    store: S,
    driver: D,
    app: App,
    config: RuntimeConfig,
    events: Option<mpsc::Receiver<BackendEvent>>,
    feed: Option<(SubscriptionId, mpsc::Receiver<Notification>)>,
    /// Actions raised by the runtime itself, queued behind the current one.
    deferred: Vec<AppAction>,
    quit: bool,
}

impl<B, S, D> Runtime<B, S, D>
where
    B: Backend,
    S: CredentialStore,
    D: Driver,
{
    /// Create a runtime. Nothing happens until [`Runtime::run`].
    pub fn new(backend: B, store: S, driver: D, config: RuntimeConfig) -> Self {
        let app = App::new(config.history_page_size);
        Self {
            backend,
            store,
            driver,
            app,
            config,
            events: None,
            feed: None,
            deferred: Vec::new(),
            quit: false,
        }
    }

    /// Run the main event loop until the user quits or input ends.
    ///
    /// 1. Renders, starts the session and executes its bootstrap actions
    /// 2. Races backend events, realtime notifications and driver intents
    /// 3. Feeds every action's outcome back into the App, breadth-first
    ///
    /// On exit the subscription is released and the backend disconnected.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render, notify or read input.
    pub async fn run(mut self) -> Result<(), RuntimeError<D::Error>> {
        self.events = self.backend.take_events();
        if self.events.is_none() {
            tracing::warn!("backend event stream unavailable, connectivity changes will be missed");
        }

        self.render()?;
        let actions = self.app.start();
        self.process(actions).await?;

        while !self.quit {
            let input = tokio::select! {
                event = recv_or_pending(&mut self.events) => Input::Backend(event),
                notification = recv_feed(&mut self.feed) => Input::Notification(notification),
                intent = self.driver.next_intent() => Input::Intent(intent),
            };

            match input {
                Input::Backend(Some(event)) => {
                    tracing::debug!(?event, "backend event");
                    let actions = self.app.handle(AppEvent::Session(session_event(event)));
                    self.process(actions).await?;
                },
                Input::Backend(None) => {
                    tracing::warn!("backend event stream closed");
                    self.events = None;
                },
                Input::Notification(Some(notification)) => {
                    let event = AppEvent::Chat(ChatEvent::NotificationReceived(notification));
                    let actions = self.app.handle(event);
                    self.process(actions).await?;
                },
                Input::Notification(None) => {
                    tracing::debug!("notification feed closed");
                    self.feed = None;
                },
                Input::Intent(Ok(Some(intent))) => {
                    tracing::debug!(?intent, "intent");
                    let actions = self.app.apply(intent);
                    self.process(actions).await?;
                },
                Input::Intent(Ok(None)) => {
                    tracing::debug!("input exhausted");
                    let actions = self.app.apply(Intent::Quit);
                    self.process(actions).await?;
                },
                Input::Intent(Err(e)) => return Err(RuntimeError::Driver(e)),
            }
        }

        self.feed = None;
        bounded(self.config.call_timeout, async {
            self.backend.disconnect().await;
            Ok(())
        })
        .await
        .unwrap_or_else(|e| tracing::warn!(error = %e, "disconnect did not complete"));
        tracing::info!("runtime stopped");
        Ok(())
    }

    /// Execute actions breadth-first until none remain.
    async fn process(&mut self, initial: Vec<AppAction>) -> Result<(), RuntimeError<D::Error>> {
        let mut pending: VecDeque<AppAction> = initial.into();

        while let Some(action) = pending.pop_front() {
            let outcome = match action {
                AppAction::Render => {
                    self.render()?;
                    continue;
                },
                AppAction::Notify(notice) => {
                    self.notify(&notice)?;
                    continue;
                },
                AppAction::Quit => {
                    self.quit = true;
                    continue;
                },
                AppAction::Session(action) => {
                    self.execute_session(action).await.map(AppEvent::Session)
                },
                AppAction::Chat(action) => self.execute_chat(action).await.map(AppEvent::Chat),
            };

            if let Some(event) = outcome {
                pending.extend(self.app.handle(event));
            }
            pending.extend(self.deferred.drain(..));
        }
        Ok(())
    }

    /// Execute one session action. Returns its outcome event, if any.
    async fn execute_session(&mut self, action: SessionAction) -> Option<SessionEvent> {
        let timeout = self.config.call_timeout;

        match action {
            SessionAction::LoadResources => match self.driver.load_resources().await {
                Ok(()) => Some(SessionEvent::ResourcesLoaded),
                Err(e) => Some(SessionEvent::ResourcesFailed { reason: e.to_string() }),
            },
            SessionAction::Connect => match bounded(timeout, self.backend.connect()).await {
                // Success arrives as `Connected` on the event stream.
                Ok(()) => None,
                Err(e) => Some(SessionEvent::ConnectFailed { reason: e.to_string() }),
            },
            SessionAction::RestoreToken => match self.store.load(&self.config.token_key) {
                Ok(token) => Some(SessionEvent::TokenRestored(token)),
                Err(e) => Some(SessionEvent::TokenStoreFailed { reason: e.to_string() }),
            },
            SessionAction::SetCredential { token } => {
                self.backend.set_token(token);
                None
            },
            SessionAction::VerifyToken => match bounded(timeout, self.backend.check_token()).await {
                Ok(verification) => {
                    tracing::debug!(valid = verification.valid, "token verified");
                    Some(SessionEvent::TokenVerified(verification))
                },
                Err(e) => Some(SessionEvent::VerifyFailed { reason: e.to_string() }),
            },
            SessionAction::RefreshToken { expires_in } => {
                match bounded(timeout, self.backend.refresh_token(expires_in)).await {
                    Ok(refreshed) => Some(SessionEvent::TokenRefreshed { token: refreshed.token }),
                    Err(e) => Some(SessionEvent::RefreshFailed { reason: e.to_string() }),
                }
            },
            SessionAction::PersistToken { token } => {
                match self.store.store(&self.config.token_key, &token) {
                    Ok(()) => None,
                    Err(e) => Some(SessionEvent::TokenPersistFailed { reason: e.to_string() }),
                }
            },
            SessionAction::ClearToken => match self.store.clear(&self.config.token_key) {
                Ok(()) => None,
                Err(e) => Some(SessionEvent::TokenPersistFailed { reason: e.to_string() }),
            },
            SessionAction::FetchCredentials => {
                match bounded(timeout, self.backend.get_credentials(LOGIN_STRATEGY)).await {
                    Ok(credentials) => {
                        Some(SessionEvent::CredentialsFetched { username: credentials.username })
                    },
                    Err(e) => Some(SessionEvent::CredentialsFailed { reason: e.to_string() }),
                }
            },
            SessionAction::Login { username, password } => {
                tracing::info!(%username, "logging in");
                let credentials = LoginCredentials { username, password };
                match bounded(timeout, self.backend.login(LOGIN_STRATEGY, &credentials)).await {
                    Ok(token) => Some(SessionEvent::LoginSucceeded { token }),
                    Err(e) => Some(SessionEvent::LoginFailed { reason: e.to_string() }),
                }
            },
            SessionAction::Render | SessionAction::Notify(_) => {
                tracing::warn!("presentation action reached the session executor");
                None
            },
        }
    }

    /// Execute one chat action. Returns its outcome event, if any.
    async fn execute_chat(&mut self, action: ChatAction) -> Option<ChatEvent> {
        let timeout = self.config.call_timeout;
        let collection = self.config.collection.clone();

        let event = match action {
            ChatAction::LoadHistory { page_size } => {
                let query = SearchQuery::by_creation_asc();
                let search = self.backend.search(&collection, &query, Pagination::first(page_size));
                match bounded(timeout, search).await {
                    Ok(result) => {
                        tracing::debug!(hits = result.hits.len(), total = result.total, "history loaded");
                        ChatEvent::HistoryLoaded(result.hits)
                    },
                    Err(e) => ChatEvent::HistoryFailed { reason: e.to_string() },
                }
            },
            ChatAction::Subscribe => {
                match bounded(timeout, self.backend.subscribe(&collection, &Filter::all())).await {
                    Ok((id, receiver)) => {
                        self.feed = Some((id.clone(), receiver));
                        ChatEvent::Subscribed(id)
                    },
                    Err(e) => ChatEvent::SubscribeFailed { reason: e.to_string() },
                }
            },
            ChatAction::ReconcileHistory { since, page_size } => {
                let query = since.map_or_else(SearchQuery::by_creation_asc, SearchQuery::created_since);
                let search = self.backend.search(&collection, &query, Pagination::first(page_size));
                match bounded(timeout, search).await {
                    Ok(result) => ChatEvent::HistoryReconciled(result.hits),
                    Err(e) => ChatEvent::ReconcileFailed { reason: e.to_string() },
                }
            },
            ChatAction::SendMessage { author, text } => {
                let body = NewMessage { text, author };
                match bounded(timeout, self.backend.create(&collection, &body)).await {
                    Ok(document) => {
                        tracing::debug!(id = %document.id, "message sent");
                        ChatEvent::MessageSent
                    },
                    Err(e) => ChatEvent::SendFailed { reason: e.to_string() },
                }
            },
            ChatAction::Unsubscribe(id) => {
                if self.feed.as_ref().is_some_and(|(active, _)| *active == id) {
                    self.feed = None;
                }
                match bounded(timeout, self.backend.unsubscribe(&id)).await {
                    Ok(()) => tracing::debug!(subscription = %id, "unsubscribed"),
                    Err(e) => {
                        // No machine owns this subscription any more.
                        let notice = Notice::warning(format!(
                            "Sorry, an error occurred while leaving the chat: {e}"
                        ));
                        let actions = self.app.push_notice(notice);
                        self.deferred.extend(actions);
                    },
                }
                return None;
            },
            ChatAction::Render | ChatAction::Notify(_) => {
                tracing::warn!("presentation action reached the chat executor");
                return None;
            },
        };

        Some(event)
    }

    fn render(&mut self) -> Result<(), RuntimeError<D::Error>> {
        let view = self.app.view();
        self.driver.render(&view).map_err(RuntimeError::Driver)
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), RuntimeError<D::Error>> {
        log_notice(notice);
        self.driver.notify(notice).map_err(RuntimeError::Driver)
    }
}

fn session_event(event: BackendEvent) -> SessionEvent {
    match event {
        BackendEvent::Connected => SessionEvent::Connected,
        BackendEvent::Reconnected => SessionEvent::Reconnected,
        BackendEvent::Disconnected => SessionEvent::Disconnected,
        BackendEvent::TokenExpired => SessionEvent::TokenExpired,
    }
}

fn log_notice(notice: &Notice) {
    match notice.severity {
        Severity::Info => tracing::info!(notice = %notice.message),
        Severity::Warning => tracing::warn!(notice = %notice.message),
        Severity::Error => tracing::error!(notice = %notice.message),
    }
}

/// Bound a backend call by `timeout`. Expiry is reported as
/// [`BackendError::Timeout`].
async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(timeout, call).await.unwrap_or(Err(BackendError::Timeout(timeout)))
}

async fn recv_or_pending<T>(receiver: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_feed(feed: &mut Option<(SubscriptionId, mpsc::Receiver<Notification>)>) -> Option<Notification> {
    match feed {
        Some((_, receiver)) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
