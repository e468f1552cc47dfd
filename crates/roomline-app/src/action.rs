//! Application side-effects.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use roomline_core::{ChatAction, Notice, SessionAction};

/// Actions produced by the App state machine.
///
/// Rendering and notices from either machine are lifted into
/// [`AppAction::Render`] and [`AppAction::Notify`]; the wrapped machine
/// actions are always I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the view.
    Render,

    /// Log a notice and show it to the user.
    Notify(Notice),

    /// Session I/O (resources, connection, credentials, authentication).
    Session(SessionAction),

    /// Chat I/O (history, subscription, send).
    Chat(ChatAction),

    /// Stop the runtime.
    Quit,
}
