//! Chat room events and actions.

use roomline_proto::{Document, Notification};

use super::SubscriptionId;
use crate::Notice;

/// Events the caller feeds into a [`super::ChatRoom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Initial history page arrived.
    HistoryLoaded(Vec<Document>),

    /// Initial history fetch failed.
    HistoryFailed {
        /// Failure description.
        reason: String,
    },

    /// Realtime subscription registered.
    Subscribed(SubscriptionId),

    /// Realtime subscription failed.
    SubscribeFailed {
        /// Failure description.
        reason: String,
    },

    /// Catch-up page fetched after subscribing.
    HistoryReconciled(Vec<Document>),

    /// Catch-up fetch failed.
    ReconcileFailed {
        /// Failure description.
        reason: String,
    },

    /// Realtime push on the subscribed collection.
    NotificationReceived(Notification),

    /// Backend accepted the outgoing message.
    MessageSent,

    /// Backend rejected the outgoing message or the call failed.
    SendFailed {
        /// Failure description.
        reason: String,
    },
}

/// Actions a [`super::ChatRoom`] produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    /// Fetch the first history page, oldest first.
    LoadHistory {
        /// Maximum number of messages.
        page_size: usize,
    },

    /// Subscribe to message creations.
    Subscribe,

    /// Fetch messages created since `since` (inclusive), oldest first.
    ///
    /// `None` fetches from the beginning.
    ReconcileHistory {
        /// Epoch milliseconds lower bound.
        since: Option<i64>,
        /// Maximum number of messages.
        page_size: usize,
    },

    /// Create a message document.
    SendMessage {
        /// Username of the sender.
        author: String,
        /// Message text.
        text: String,
    },

    /// Release a subscription.
    Unsubscribe(SubscriptionId),

    /// Report something to the user and the log.
    Notify(Notice),

    /// State changed; re-render.
    Render,
}
