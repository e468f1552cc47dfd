//! User intents.

/// What the user asked for, as decoded by the presentation layer.
#[derive(Clone, PartialEq, Eq)]
pub enum Intent {
    /// Submit the login form.
    SubmitLogin {
        /// Username field.
        username: String,
        /// Password field.
        password: String,
    },

    /// Replace the compose field.
    EditCompose(String),

    /// Send the compose field.
    SubmitMessage,

    /// Leave the application.
    Quit,
}

// Passwords must never reach the log.
impl std::fmt::Debug for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmitLogin { username, .. } => f
                .debug_struct("SubmitLogin")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::EditCompose(text) => f.debug_tuple("EditCompose").field(text).finish(),
            Self::SubmitMessage => f.write_str("SubmitMessage"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}
