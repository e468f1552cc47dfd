//! Session events and actions.

use std::time::Duration;

use crate::{Notice, TokenVerification};

/// Events the caller feeds into the [`crate::Session`].
///
/// Each variant reports either a backend connectivity change or the outcome
/// of a [`SessionAction`] the caller executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// UI resources finished loading.
    ResourcesLoaded,

    /// UI resources failed to load.
    ResourcesFailed {
        /// Failure description.
        reason: String,
    },

    /// Backend connection established.
    Connected,

    /// Backend connection re-established after a loss.
    Reconnected,

    /// Backend connection lost.
    Disconnected,

    /// `Connect` failed. The backend keeps retrying on its own.
    ConnectFailed {
        /// Failure description.
        reason: String,
    },

    /// Credential store read finished. `None` if no token is stored.
    TokenRestored(Option<String>),

    /// Credential store read failed.
    TokenStoreFailed {
        /// Failure description.
        reason: String,
    },

    /// Backend answered a verification request.
    TokenVerified(TokenVerification),

    /// Verification request failed.
    VerifyFailed {
        /// Failure description.
        reason: String,
    },

    /// Backend issued an extended-lifetime token.
    TokenRefreshed {
        /// The refreshed token.
        token: String,
    },

    /// Refresh request failed. The current token remains usable.
    RefreshFailed {
        /// Failure description.
        reason: String,
    },

    /// Writing or clearing the token in the credential store failed.
    TokenPersistFailed {
        /// Failure description.
        reason: String,
    },

    /// Backend returned the authenticated user's credentials.
    CredentialsFetched {
        /// Username of the authenticated user.
        username: String,
    },

    /// Credentials request failed.
    CredentialsFailed {
        /// Failure description.
        reason: String,
    },

    /// Login accepted; the backend issued a token.
    LoginSucceeded {
        /// Newly issued session token.
        token: String,
    },

    /// Login rejected or failed.
    LoginFailed {
        /// Server-provided failure text.
        reason: String,
    },

    /// Backend reports the session token has expired.
    TokenExpired,
}

/// Actions the [`crate::Session`] produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Load UI resources (fonts, assets).
    LoadResources,

    /// Ask the backend to connect.
    Connect,

    /// Read the persisted token from the credential store.
    RestoreToken,

    /// Assign the backend's active credential. Always precedes `VerifyToken`.
    SetCredential {
        /// Token to use for subsequent calls. `None` clears it.
        token: Option<String>,
    },

    /// Ask the backend whether the active credential is valid.
    VerifyToken,

    /// Request an extended-lifetime token.
    RefreshToken {
        /// Requested lifetime.
        expires_in: Duration,
    },

    /// Write a token to the credential store.
    PersistToken {
        /// Token to persist.
        token: String,
    },

    /// Remove the token from the credential store.
    ClearToken,

    /// Fetch the authenticated user's credentials (username).
    FetchCredentials,

    /// Authenticate with username and password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    /// Report something to the user and the log.
    Notify(Notice),

    /// State changed; re-render.
    Render,
}
