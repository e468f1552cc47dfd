//! Message synchronization for the shared room.
//!
//! [`ChatRoom`] keeps the local message list in step with the backend: one
//! history fetch, then a realtime subscription, then a catch-up fetch that
//! closes the gap between the two. Sending goes through the backend only; the
//! local list changes when the authoritative copy comes back through the
//! subscription.
//!
//! ```text
//! open ─> LoadHistory ─> HistoryLoaded ─> Subscribe ─> Subscribed ─> ReconcileHistory
//!                                                                       │
//!                                  NotificationReceived ──> insert <────┘
//! ```

mod event;

use std::{collections::HashSet, fmt};

pub use event::{ChatAction, ChatEvent};
use roomline_proto::Document;

use crate::{Message, Notice};

/// Number of messages fetched by the initial history page.
pub const HISTORY_PAGE_SIZE: usize = 100;

/// Opaque handle of an active realtime subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryState {
    NotLoaded,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SubscriptionState {
    None,
    Pending,
    Active(SubscriptionId),
}

/// Message list state machine for one chat room.
#[derive(Debug, Clone)]
pub struct ChatRoom {
    username: Option<String>,
    page_size: usize,
    messages: Vec<Message>,
    known_ids: HashSet<String>,
    history: HistoryState,
    subscription: SubscriptionState,
    compose: String,
    sending: bool,
    closed: bool,
}

impl ChatRoom {
    /// Create a room that fetches `page_size` messages of history.
    pub fn new(username: Option<String>, page_size: usize) -> Self {
        Self {
            username,
            page_size,
            messages: Vec::new(),
            known_ids: HashSet::new(),
            history: HistoryState::NotLoaded,
            subscription: SubscriptionState::None,
            compose: String::new(),
            sending: false,
            closed: false,
        }
    }

    /// Start loading history.
    ///
    /// Emits `LoadHistory` at most once while a fetch is in flight or after
    /// it succeeded. A failed fetch is retried by [`ChatRoom::resume`].
    pub fn open(&mut self) -> Vec<ChatAction> {
        if self.closed || self.history != HistoryState::NotLoaded {
            return vec![];
        }
        self.history = HistoryState::Loading;
        vec![ChatAction::LoadHistory { page_size: self.page_size }, ChatAction::Render]
    }

    /// Pick up where synchronization stopped, after the connection came back.
    ///
    /// Retries a failed history fetch or subscription. With a live
    /// subscription, catches up on messages missed while offline.
    pub fn resume(&mut self) -> Vec<ChatAction> {
        if self.closed {
            return vec![];
        }
        match self.history {
            HistoryState::NotLoaded => self.open(),
            HistoryState::Loading => vec![],
            HistoryState::Loaded => match self.subscription {
                SubscriptionState::None => {
                    self.subscription = SubscriptionState::Pending;
                    vec![ChatAction::Subscribe]
                },
                SubscriptionState::Pending => vec![],
                SubscriptionState::Active(_) => vec![self.catch_up()],
            },
        }
    }

    /// Send the compose text as the current user.
    ///
    /// Does nothing when the text is blank, the username is unknown, or a
    /// send is already in flight. The compose text is kept until the backend
    /// confirms the send.
    pub fn submit(&mut self) -> Vec<ChatAction> {
        if self.closed || self.sending || self.compose.trim().is_empty() {
            return vec![];
        }
        let Some(author) = self.username.clone() else {
            return vec![];
        };

        self.sending = true;
        vec![ChatAction::SendMessage { author, text: self.compose.clone() }, ChatAction::Render]
    }

    /// Replace the compose text.
    pub fn set_compose(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    /// Update the author used for outgoing messages.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    /// Close the room, releasing its subscription.
    ///
    /// A subscription that is still pending is released when its
    /// `Subscribed` event arrives.
    pub fn close(&mut self) -> Vec<ChatAction> {
        if self.closed {
            return vec![];
        }
        self.closed = true;
        match &self.subscription {
            SubscriptionState::Active(id) => {
                let id = id.clone();
                self.subscription = SubscriptionState::None;
                vec![ChatAction::Unsubscribe(id)]
            },
            SubscriptionState::Pending | SubscriptionState::None => vec![],
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: ChatEvent) -> Vec<ChatAction> {
        if self.closed && !matches!(event, ChatEvent::Subscribed(_)) {
            return vec![];
        }

        match event {
            ChatEvent::HistoryLoaded(documents) => {
                if self.history != HistoryState::Loading {
                    return vec![];
                }
                self.history = HistoryState::Loaded;

                let mut actions = self.merge(documents);
                if self.subscription == SubscriptionState::None {
                    self.subscription = SubscriptionState::Pending;
                    actions.push(ChatAction::Subscribe);
                }
                actions.push(ChatAction::Render);
                actions
            },
            ChatEvent::HistoryFailed { reason } => {
                if self.history == HistoryState::Loading {
                    self.history = HistoryState::NotLoaded;
                }
                vec![notify(format!("Sorry, the message history could not be loaded: {reason}"))]
            },
            ChatEvent::SubscribeFailed { reason } => {
                self.subscription = SubscriptionState::None;
                vec![notify(format!("Sorry, new messages cannot be received: {reason}"))]
            },
            ChatEvent::HistoryReconciled(documents) => {
                let full_page = documents.len() >= self.page_size;
                let held = self.messages.len();
                let mut actions = self.merge(documents);
                // A full page that taught us something may have more behind it.
                if full_page && self.messages.len() > held {
                    actions.push(self.catch_up());
                }
                actions.push(ChatAction::Render);
                actions
            },
            ChatEvent::ReconcileFailed { reason } => {
                vec![notify(format!("Sorry, some recent messages could not be loaded: {reason}"))]
            },
            ChatEvent::NotificationReceived(notification) => {
                if !notification.is_document_created() {
                    return vec![];
                }
                match self.insert(&notification.result) {
                    Ok(true) => vec![ChatAction::Render],
                    Ok(false) => vec![],
                    Err(reason) => vec![unreadable(&reason)],
                }
            },
            ChatEvent::MessageSent => {
                self.sending = false;
                self.compose.clear();
                vec![ChatAction::Render]
            },
            ChatEvent::SendFailed { reason } => {
                self.sending = false;
                vec![
                    notify(format!("Sorry, your message could not be sent: {reason}")),
                    ChatAction::Render,
                ]
            },
            ChatEvent::Subscribed(id) => self.on_subscribed(id),
        }
    }

    fn on_subscribed(&mut self, id: SubscriptionId) -> Vec<ChatAction> {
        if self.closed {
            self.subscription = SubscriptionState::None;
            return vec![ChatAction::Unsubscribe(id)];
        }
        if self.subscription != SubscriptionState::Pending {
            // Unrequested or duplicate registration.
            return vec![ChatAction::Unsubscribe(id)];
        }

        self.subscription = SubscriptionState::Active(id);
        vec![self.catch_up()]
    }

    /// Fetch everything from the newest held message on. The bound is
    /// inclusive, so messages sharing its timestamp are not skipped.
    fn catch_up(&self) -> ChatAction {
        let since = self.messages.last().map(Message::created_at_millis);
        ChatAction::ReconcileHistory { since, page_size: self.page_size }
    }

    /// Insert every document not yet held. Undecodable documents each
    /// produce one notice.
    fn merge(&mut self, documents: Vec<Document>) -> Vec<ChatAction> {
        documents
            .iter()
            .filter_map(|document| self.insert(document).err())
            .map(|reason| unreadable(&reason))
            .collect()
    }

    /// Insert at the `created_at` position. Returns `false` for a duplicate.
    fn insert(&mut self, document: &Document) -> Result<bool, String> {
        if self.known_ids.contains(&document.id) {
            return Ok(false);
        }
        let message = Message::from_document(document).map_err(|e| e.to_string())?;

        let at = self.messages.partition_point(|m| m.created_at <= message.created_at);
        self.known_ids.insert(message.id.clone());
        self.messages.insert(at, message);
        Ok(true)
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current compose text.
    pub fn compose(&self) -> &str {
        &self.compose
    }

    /// Author used for outgoing messages.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether the initial history page has been applied.
    pub fn is_history_loaded(&self) -> bool {
        self.history == HistoryState::Loaded
    }

    /// Handle of the active subscription.
    pub fn subscription(&self) -> Option<&SubscriptionId> {
        match &self.subscription {
            SubscriptionState::Active(id) => Some(id),
            SubscriptionState::None | SubscriptionState::Pending => None,
        }
    }

    /// Whether a send is awaiting its outcome.
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Whether the room has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn notify(message: String) -> ChatAction {
    ChatAction::Notify(Notice::error(message))
}

fn unreadable(reason: &str) -> ChatAction {
    notify(format!("Sorry, a message could not be displayed: {reason}"))
}
