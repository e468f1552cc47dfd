//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than live state so every check in
//! one pass sees the same moment.

use roomline_app::{App, ViewState};
use roomline_core::{Message, TokenVerification};

/// Observable client state at one point in time.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Loading screen shown.
    pub loading: bool,
    /// Chat screen shown.
    pub logged_in: bool,
    /// Authenticated username.
    pub user: Option<String>,
    /// Last verification outcome. `None` when unknown to the observer.
    pub verification: Option<TokenVerification>,
    /// Whether the verification outcome is observable at all. A rendered
    /// view does not expose it.
    pub verification_observed: bool,
    /// Open chat room.
    pub room: Option<RoomSnapshot>,
    /// Undrained notices.
    pub notice_count: usize,
}

/// Observable chat room state.
#[derive(Debug, Clone, Default)]
pub struct RoomSnapshot {
    /// Messages in display order.
    pub messages: Vec<Message>,
}

impl SystemSnapshot {
    /// Capture everything `app` exposes.
    pub fn from_app(app: &App) -> Self {
        let session = app.session();
        Self {
            loading: session.is_loading(),
            logged_in: session.is_logged_in(),
            user: session.authenticated_user().map(str::to_string),
            verification: session.verification(),
            verification_observed: true,
            room: app.room().map(|room| RoomSnapshot { messages: room.messages().to_vec() }),
            notice_count: app.view().notices.len(),
        }
    }

    /// Capture what a driver sees in a rendered view.
    ///
    /// A view shows messages only on the chat screen, so the room is taken
    /// to be open exactly when `logged_in` is set.
    pub fn from_view(view: &ViewState) -> Self {
        Self {
            loading: view.loading,
            logged_in: view.logged_in,
            user: view.username.clone(),
            verification: None,
            verification_observed: false,
            room: view.logged_in.then(|| RoomSnapshot { messages: view.messages.clone() }),
            notice_count: view.notices.len(),
        }
    }
}
