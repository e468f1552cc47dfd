//! Session state machine.
//!
//! Owns connectivity and authentication. Takes the app from cold start to
//! exactly one of two screens, login or chat, and keeps the session token
//! fresh. Uses the action pattern: [`Session::handle`] consumes a
//! [`SessionEvent`] and returns the [`SessionAction`]s the caller must
//! execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start ┌──────────────────┐ loaded ┌────────────┐ connected ┌───────────┐
//! │ Init │──────>│ ResourcesLoading │───────>│ Connecting │──────────>│ Restoring │
//! └──────┘       └──────────────────┘        └────────────┘           └───────────┘
//!                                                              token    │      │ no token
//!                                                    ┌──────────────────┘      ↓
//!                                                    ↓              ┌───────────────┐
//!                 ┌───────────────┐  valid   ┌───────────┐ invalid  │ LoginRequired │
//!                 │ Authenticated │<─────────│ Verifying │─────────>│               │
//!                 └───────────────┘          └───────────┘          └───────────────┘
//!                         │                        ↑      login succeeded  │
//!                         │ token expired          └───────────────────────┘
//!                         └───────────────────────────────────────────────>
//! ```
//!
//! Connectivity is tracked beside the phase. `Connected` and `Reconnected`
//! are handled identically: both re-trigger token restoration, which
//! re-verifies the stored token without ever re-issuing a login.

mod event;

use std::time::Duration;

pub use event::{SessionAction, SessionEvent};

use crate::Notice;

/// Lifetime requested when refreshing a verified token (2 days).
pub const REFRESH_EXPIRY: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Authentication strategy used for login and credential lookup.
pub const LOGIN_STRATEGY: &str = "local";

const DISCONNECTED: &str =
    "It looks like you're not connected to the chat server. Trying to reconnect...";
const SESSION_EXPIRED: &str = "Your session has expired, you need to re-authenticate.";

/// Backend connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// No connection to the backend.
    Disconnected,
    /// Connected to the backend.
    Connected,
}

/// Outcome of a token verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenVerification {
    /// Whether the token is currently valid.
    pub valid: bool,
}

impl TokenVerification {
    /// A valid verification.
    pub const VALID: Self = Self { valid: true };
    /// An invalid verification.
    pub const INVALID: Self = Self { valid: false };
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing started.
    Init,
    /// Waiting for UI resources.
    ResourcesLoading,
    /// Resources loaded, waiting for the first connection.
    Connecting,
    /// Connected, reading the persisted token.
    Restoring,
    /// Token assigned, waiting for verification.
    Verifying,
    /// Token verified; the chat screen is shown.
    Authenticated,
    /// No valid token; the login screen is shown.
    LoginRequired,
}

/// Field-level validation state of the login form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Last submission had an empty username.
    pub username_missing: bool,
    /// Last submission had an empty password.
    pub password_missing: bool,
}

/// Session state machine.
///
/// Every field has a single writer:
/// - `connectivity` is written only by connectivity events
/// - `session_token` is written only by token restore, login success and expiry
/// - `verification` is written only by verification outcomes (and expiry)
#[derive(Debug, Clone)]
pub struct Session {
    phase: SessionPhase,
    connectivity: Connectivity,
    session_token: Option<String>,
    verification: Option<TokenVerification>,
    authenticated_user: Option<String>,
    logged_in: bool,
    bootstrap_complete: bool,
    login_form: LoginForm,
    login_in_flight: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session in [`SessionPhase::Init`].
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Init,
            connectivity: Connectivity::Disconnected,
            session_token: None,
            verification: None,
            authenticated_user: None,
            logged_in: false,
            bootstrap_complete: false,
            login_form: LoginForm::default(),
            login_in_flight: false,
        }
    }

    /// Begin bootstrap by loading UI resources.
    ///
    /// Only valid from [`SessionPhase::Init`]; later calls return no actions.
    pub fn start(&mut self) -> Vec<SessionAction> {
        if self.phase != SessionPhase::Init {
            return vec![];
        }
        self.phase = SessionPhase::ResourcesLoading;
        vec![SessionAction::LoadResources, SessionAction::Render]
    }

    /// Submit the login form.
    ///
    /// Both fields must be non-empty. Ignored unless the login screen is
    /// shown and no login is already in flight.
    pub fn submit_login(&mut self, username: &str, password: &str) -> Vec<SessionAction> {
        if self.phase != SessionPhase::LoginRequired || self.login_in_flight {
            return vec![];
        }

        self.login_form =
            LoginForm { username_missing: username.is_empty(), password_missing: password.is_empty() };
        if self.login_form.username_missing || self.login_form.password_missing {
            return vec![SessionAction::Render];
        }

        self.login_in_flight = true;
        vec![
            SessionAction::Login { username: username.to_string(), password: password.to_string() },
            SessionAction::Render,
        ]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::ResourcesLoaded => {
                if self.phase != SessionPhase::ResourcesLoading {
                    return vec![];
                }
                self.phase = SessionPhase::Connecting;
                vec![SessionAction::Connect, SessionAction::Render]
            },
            SessionEvent::ResourcesFailed { reason } => vec![
                SessionAction::Notify(Notice::warning(format!(
                    "Sorry, an error occurred while the application was loading: {reason}"
                ))),
                SessionAction::Render,
            ],
            SessionEvent::Connected | SessionEvent::Reconnected => self.on_connected(),
            SessionEvent::Disconnected => {
                self.connectivity = Connectivity::Disconnected;
                vec![SessionAction::Notify(Notice::warning(DISCONNECTED)), SessionAction::Render]
            },
            SessionEvent::ConnectFailed { reason } => {
                self.connectivity = Connectivity::Disconnected;
                vec![
                    SessionAction::Notify(Notice::warning(format!("{DISCONNECTED} ({reason})"))),
                    SessionAction::Render,
                ]
            },
            SessionEvent::TokenRestored(token) => self.on_token_restored(token),
            SessionEvent::TokenStoreFailed { reason } => {
                let mut actions = vec![user_info_error(&reason)];
                actions.extend(self.on_token_restored(None));
                actions
            },
            SessionEvent::TokenVerified(verification) => self.on_verified(verification),
            SessionEvent::VerifyFailed { reason } => {
                let mut actions = vec![notify_error(reason)];
                actions.extend(self.on_verified(TokenVerification::INVALID));
                actions
            },
            SessionEvent::TokenRefreshed { token } => vec![SessionAction::PersistToken { token }],
            SessionEvent::RefreshFailed { reason }
            | SessionEvent::TokenPersistFailed { reason }
            | SessionEvent::CredentialsFailed { reason } => vec![user_info_error(&reason)],
            SessionEvent::CredentialsFetched { username } => {
                // A reply that outlived its verification must not resurrect a user.
                if !self.is_verified() {
                    return vec![];
                }
                self.authenticated_user = Some(username);
                vec![SessionAction::Render]
            },
            SessionEvent::LoginSucceeded { token } => {
                self.login_in_flight = false;
                self.assign_token(token, true)
            },
            SessionEvent::LoginFailed { reason } => {
                self.login_in_flight = false;
                vec![notify_error(reason), SessionAction::Render]
            },
            SessionEvent::TokenExpired => self.on_token_expired(),
        }
    }

    /// Drop the dead token everywhere so reconnects stop re-verifying it.
    fn on_token_expired(&mut self) -> Vec<SessionAction> {
        if !self.logged_in {
            return vec![];
        }

        self.verification = Some(TokenVerification::INVALID);
        self.session_token = None;
        self.authenticated_user = None;
        self.logged_in = false;
        self.phase = SessionPhase::LoginRequired;
        vec![
            SessionAction::ClearToken,
            SessionAction::SetCredential { token: None },
            SessionAction::Notify(Notice::warning(SESSION_EXPIRED)),
            SessionAction::Render,
        ]
    }

    fn on_connected(&mut self) -> Vec<SessionAction> {
        self.connectivity = Connectivity::Connected;

        match self.phase {
            SessionPhase::Init | SessionPhase::ResourcesLoading => vec![SessionAction::Render],
            SessionPhase::Connecting => {
                self.phase = SessionPhase::Restoring;
                vec![SessionAction::RestoreToken, SessionAction::Render]
            },
            SessionPhase::Restoring
            | SessionPhase::Verifying
            | SessionPhase::Authenticated
            | SessionPhase::LoginRequired => {
                vec![SessionAction::RestoreToken, SessionAction::Render]
            },
        }
    }

    fn on_token_restored(&mut self, token: Option<String>) -> Vec<SessionAction> {
        match token {
            Some(token) => self.assign_token(token, false),
            None => {
                // No token means no verification call: route straight to login.
                self.session_token = None;
                self.on_verified(TokenVerification::INVALID)
            },
        }
    }

    /// Make `token` the session token. The credential slot is always assigned
    /// before verification is requested.
    fn assign_token(&mut self, token: String, persist: bool) -> Vec<SessionAction> {
        let mut actions = Vec::with_capacity(4);
        if persist {
            actions.push(SessionAction::PersistToken { token: token.clone() });
        }
        actions.push(SessionAction::SetCredential { token: Some(token.clone()) });
        self.session_token = Some(token);

        if self.connectivity == Connectivity::Connected {
            self.phase = SessionPhase::Verifying;
            actions.push(SessionAction::VerifyToken);
        }
        actions.push(SessionAction::Render);
        actions
    }

    fn on_verified(&mut self, verification: TokenVerification) -> Vec<SessionAction> {
        self.verification = Some(verification);
        self.bootstrap_complete = true;

        if verification.valid {
            self.logged_in = true;
            self.phase = SessionPhase::Authenticated;
            self.login_form = LoginForm::default();
            vec![
                SessionAction::RefreshToken { expires_in: REFRESH_EXPIRY },
                SessionAction::FetchCredentials,
                SessionAction::Render,
            ]
        } else {
            self.logged_in = false;
            self.authenticated_user = None;
            self.phase = SessionPhase::LoginRequired;
            vec![SessionAction::Render]
        }
    }

    fn is_verified(&self) -> bool {
        self.verification.is_some_and(|v| v.valid)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current backend connectivity.
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Current session token. `None` if no token has been restored or issued.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Last verification outcome. `None` if no verification has happened.
    pub fn verification(&self) -> Option<TokenVerification> {
        self.verification
    }

    /// Username of the authenticated user. `None` unless the last
    /// verification was valid and credentials have arrived.
    pub fn authenticated_user(&self) -> Option<&str> {
        self.authenticated_user.as_deref()
    }

    /// Whether the chat screen should be shown.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Whether bootstrap finished. Once set it stays set, so reconnects do
    /// not bring back the loading screen.
    pub fn bootstrap_complete(&self) -> bool {
        self.bootstrap_complete
    }

    /// Whether the loading screen should be shown.
    pub fn is_loading(&self) -> bool {
        !self.bootstrap_complete
    }

    /// Login form validation state.
    pub fn login_form(&self) -> LoginForm {
        self.login_form
    }

    /// Whether a login request is awaiting its outcome.
    pub fn login_in_flight(&self) -> bool {
        self.login_in_flight
    }
}

fn notify_error(message: impl Into<String>) -> SessionAction {
    SessionAction::Notify(Notice::error(message))
}

fn user_info_error(reason: &str) -> SessionAction {
    notify_error(format!("Sorry, an error occurred while managing user information: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_session() -> Session {
        let mut session = Session::new();
        let _ = session.start();
        let _ = session.handle(SessionEvent::ResourcesLoaded);
        let _ = session.handle(SessionEvent::Connected);
        session
    }

    fn authenticated_session() -> Session {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(Some("abc123".into())));
        let _ = session.handle(SessionEvent::TokenVerified(TokenVerification::VALID));
        let _ =
            session.handle(SessionEvent::CredentialsFetched { username: "alice".into() });
        session
    }

    fn count(actions: &[SessionAction], pred: impl Fn(&SessionAction) -> bool) -> usize {
        actions.iter().filter(|a| pred(a)).count()
    }

    #[test]
    fn bootstrap_loads_resources_then_connects() {
        let mut session = Session::new();

        let actions = session.start();
        assert!(matches!(actions.as_slice(), [SessionAction::LoadResources, SessionAction::Render]));
        assert_eq!(session.phase(), SessionPhase::ResourcesLoading);

        let actions = session.handle(SessionEvent::ResourcesLoaded);
        assert!(matches!(actions.as_slice(), [SessionAction::Connect, SessionAction::Render]));
        assert_eq!(session.phase(), SessionPhase::Connecting);
        assert!(session.is_loading());
    }

    #[test]
    fn start_is_only_valid_once() {
        let mut session = Session::new();
        let _ = session.start();
        assert!(session.start().is_empty());
    }

    #[test]
    fn resource_failure_stays_loading() {
        let mut session = Session::new();
        let _ = session.start();

        let actions = session.handle(SessionEvent::ResourcesFailed { reason: "font".into() });
        assert_eq!(count(&actions, |a| matches!(a, SessionAction::Notify(_))), 1);
        assert_eq!(session.phase(), SessionPhase::ResourcesLoading);
        assert!(session.is_loading());
    }

    #[test]
    fn connect_restores_token() {
        let mut session = Session::new();
        let _ = session.start();
        let _ = session.handle(SessionEvent::ResourcesLoaded);

        let actions = session.handle(SessionEvent::Connected);
        assert!(actions.contains(&SessionAction::RestoreToken));
        assert_eq!(session.connectivity(), Connectivity::Connected);
        assert_eq!(session.phase(), SessionPhase::Restoring);
    }

    #[test]
    fn stored_token_is_assigned_before_verification() {
        let mut session = connected_session();

        let actions = session.handle(SessionEvent::TokenRestored(Some("abc123".into())));
        assert!(matches!(actions.as_slice(), [
            SessionAction::SetCredential { token: Some(t) },
            SessionAction::VerifyToken,
            SessionAction::Render
        ] if t == "abc123"));
        assert_eq!(session.phase(), SessionPhase::Verifying);
    }

    #[test]
    fn valid_token_logs_in_and_schedules_refresh() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(Some("abc123".into())));

        let actions = session.handle(SessionEvent::TokenVerified(TokenVerification::VALID));
        assert!(session.is_logged_in());
        assert!(session.bootstrap_complete());
        assert!(actions.contains(&SessionAction::RefreshToken { expires_in: REFRESH_EXPIRY }));
        assert_eq!(count(&actions, |a| *a == SessionAction::FetchCredentials), 1);
        assert_eq!(REFRESH_EXPIRY, Duration::from_secs(172_800));

        // Username only arrives with credentials.
        assert_eq!(session.authenticated_user(), None);
        let _ = session.handle(SessionEvent::CredentialsFetched { username: "alice".into() });
        assert_eq!(session.authenticated_user(), Some("alice"));
    }

    #[test]
    fn absent_token_routes_to_login_without_verify() {
        let mut session = connected_session();

        let actions = session.handle(SessionEvent::TokenRestored(None));
        assert_eq!(count(&actions, |a| *a == SessionAction::VerifyToken), 0);
        assert!(!session.is_logged_in());
        assert!(session.bootstrap_complete());
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
        assert_eq!(session.verification(), Some(TokenVerification::INVALID));
    }

    #[test]
    fn store_failure_is_treated_as_absent() {
        let mut session = connected_session();

        let actions = session.handle(SessionEvent::TokenStoreFailed { reason: "locked".into() });
        assert_eq!(count(&actions, |a| matches!(a, SessionAction::Notify(_))), 1);
        assert_eq!(count(&actions, |a| *a == SessionAction::VerifyToken), 0);
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
    }

    #[test]
    fn invalid_token_routes_to_login() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(Some("stale".into())));

        let actions = session.handle(SessionEvent::TokenVerified(TokenVerification::INVALID));
        assert!(!session.is_logged_in());
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
        assert_eq!(count(&actions, |a| matches!(a, SessionAction::RefreshToken { .. })), 0);
    }

    #[test]
    fn verify_failure_is_an_invalid_verification() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(Some("abc".into())));

        let actions = session.handle(SessionEvent::VerifyFailed { reason: "timeout".into() });
        assert_eq!(count(&actions, |a| matches!(a, SessionAction::Notify(_))), 1);
        assert_eq!(session.verification(), Some(TokenVerification::INVALID));
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
    }

    #[test]
    fn token_set_while_disconnected_defers_verification() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));
        let _ = session.handle(SessionEvent::Disconnected);

        let actions = session.submit_login("alice", "pw");
        assert!(actions.iter().any(|a| matches!(a, SessionAction::Login { .. })));

        let actions = session.handle(SessionEvent::LoginSucceeded { token: "fresh".into() });
        assert!(actions.contains(&SessionAction::SetCredential { token: Some("fresh".into()) }));
        assert!(!actions.contains(&SessionAction::VerifyToken));

        let actions = session.handle(SessionEvent::Reconnected);
        assert!(actions.contains(&SessionAction::RestoreToken));
    }

    #[test]
    fn login_validates_fields() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));

        let actions = session.submit_login("", "");
        assert!(matches!(actions.as_slice(), [SessionAction::Render]));
        assert_eq!(
            session.login_form(),
            LoginForm { username_missing: true, password_missing: true }
        );

        let actions = session.submit_login("alice", "");
        assert!(matches!(actions.as_slice(), [SessionAction::Render]));
        assert_eq!(
            session.login_form(),
            LoginForm { username_missing: false, password_missing: true }
        );
    }

    #[test]
    fn login_success_persists_and_verifies() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));
        let _ = session.submit_login("alice", "secret");

        let actions = session.handle(SessionEvent::LoginSucceeded { token: "fresh".into() });
        assert!(matches!(actions.as_slice(), [
            SessionAction::PersistToken { .. },
            SessionAction::SetCredential { .. },
            SessionAction::VerifyToken,
            SessionAction::Render
        ]));
        assert_eq!(session.session_token(), Some("fresh"));
    }

    #[test]
    fn duplicate_login_submission_is_ignored() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));

        let _ = session.submit_login("alice", "secret");
        assert!(session.submit_login("alice", "secret").is_empty());

        let _ = session.handle(SessionEvent::LoginFailed { reason: "bad password".into() });
        assert!(!session.submit_login("alice", "secret").is_empty());
    }

    #[test]
    fn login_failure_reports_server_text() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));
        let _ = session.submit_login("alice", "wrong");

        let actions = session.handle(SessionEvent::LoginFailed { reason: "wrong password".into() });
        assert!(actions.contains(&SessionAction::Notify(Notice::error("wrong password"))));
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
    }

    #[test]
    fn login_ignored_when_authenticated() {
        let mut session = authenticated_session();
        assert!(session.submit_login("alice", "pw").is_empty());
    }

    #[test]
    fn token_expiry_forces_login() {
        let mut session = authenticated_session();

        let actions = session.handle(SessionEvent::TokenExpired);
        assert!(!session.is_logged_in());
        assert_eq!(session.authenticated_user(), None);
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
        assert!(actions.contains(&SessionAction::Notify(Notice::warning(SESSION_EXPIRED))));
        assert_eq!(actions[..2], [SessionAction::ClearToken, SessionAction::SetCredential {
            token: None
        }]);
        assert_eq!(session.session_token(), None);
    }

    #[test]
    fn token_expiry_before_login_is_silent() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(None));

        let actions = session.handle(SessionEvent::TokenExpired);
        assert!(actions.is_empty());
        assert_eq!(session.phase(), SessionPhase::LoginRequired);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn late_credentials_after_expiry_are_discarded() {
        let mut session = connected_session();
        let _ = session.handle(SessionEvent::TokenRestored(Some("abc".into())));
        let _ = session.handle(SessionEvent::TokenVerified(TokenVerification::VALID));
        let _ = session.handle(SessionEvent::TokenExpired);

        let actions = session.handle(SessionEvent::CredentialsFetched { username: "alice".into() });
        assert!(actions.is_empty());
        assert_eq!(session.authenticated_user(), None);
    }

    #[test]
    fn reconnect_reverifies_without_login() {
        let mut session = authenticated_session();
        let _ = session.handle(SessionEvent::Disconnected);
        assert_eq!(session.connectivity(), Connectivity::Disconnected);
        assert!(session.is_logged_in());

        let actions = session.handle(SessionEvent::Reconnected);
        assert!(actions.contains(&SessionAction::RestoreToken));

        let actions = session.handle(SessionEvent::TokenRestored(Some("abc123".into())));
        assert!(actions.contains(&SessionAction::VerifyToken));
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Login { .. })));
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::PersistToken { .. })));
    }

    #[test]
    fn refreshed_token_is_persisted_not_reverified() {
        let mut session = authenticated_session();

        let actions = session.handle(SessionEvent::TokenRefreshed { token: "longer".into() });
        assert_eq!(actions, vec![SessionAction::PersistToken { token: "longer".into() }]);
        assert_eq!(session.session_token(), Some("abc123"));
    }

    #[test]
    fn refresh_failure_keeps_session() {
        let mut session = authenticated_session();

        let actions = session.handle(SessionEvent::RefreshFailed { reason: "busy".into() });
        assert_eq!(count(&actions, |a| matches!(a, SessionAction::Notify(_))), 1);
        assert!(session.is_logged_in());
        assert_eq!(session.authenticated_user(), Some("alice"));
    }

    #[test]
    fn disconnect_warns_without_logout() {
        let mut session = authenticated_session();

        let actions = session.handle(SessionEvent::Disconnected);
        assert!(actions.contains(&SessionAction::Notify(Notice::warning(DISCONNECTED))));
        assert!(session.is_logged_in());
        assert!(!session.is_loading());
    }
}
