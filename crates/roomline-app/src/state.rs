//! Observable application state.
//!
//! [`ViewState`] is the whole presentation contract: a driver renders from it
//! and nothing else.

use roomline_core::{Connectivity, LoginForm, Message, Notice};

/// Maximum number of notices retained for display.
pub const MAX_NOTICES: usize = 32;

/// Snapshot of everything a screen needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Backend connectivity.
    pub connectivity: Connectivity,
    /// Bootstrap not finished; show the loading screen.
    pub loading: bool,
    /// Show the chat screen rather than the login screen.
    pub logged_in: bool,
    /// Authenticated username, once known.
    pub username: Option<String>,
    /// Messages, oldest first.
    pub messages: Vec<Message>,
    /// Compose field.
    pub compose_text: String,
    /// Login form validation state.
    pub login_form: LoginForm,
    /// Undrained notices, oldest first.
    pub notices: Vec<Notice>,
}
