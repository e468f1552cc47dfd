//! Application events.
//!
//! [`AppEvent`] routes an event to the machine that owns it.

use roomline_core::{ChatEvent, SessionEvent};

/// Events consumed by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Connectivity change or outcome of a session action.
    Session(SessionEvent),

    /// Notification or outcome of a chat action.
    Chat(ChatEvent),
}
