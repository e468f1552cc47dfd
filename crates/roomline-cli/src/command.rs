//! Input line parsing.

use roomline_app::Intent;
use thiserror::Error;

/// Help text printed for `/help`.
pub const HELP: &str = "\
Commands:
  /login NAME PASSWORD  sign in
  /quit                 leave
  /help                 show this help
Any other line is sent as a message.";

/// Input that is not a known command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A `/` command that does not exist.
    #[error("Unknown command {0}. Type /help for a list of commands.")]
    Unknown(String),
}

/// One parsed input line.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `/login NAME PASSWORD`. Missing words are left empty for the login
    /// form to flag.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// `/quit`
    Quit,
    /// `/help`
    Help,
    /// Any other non-blank text.
    Say(String),
    /// Blank line.
    Empty,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Quit => f.write_str("Quit"),
            Self::Help => f.write_str("Help"),
            Self::Say(text) => f.debug_tuple("Say").field(text).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl Command {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }
        if !trimmed.starts_with('/') {
            return Ok(Self::Say(trimmed.to_string()));
        }

        let mut words = trimmed.split_whitespace();
        match words.next() {
            Some("/login") => Ok(Self::Login {
                username: words.next().unwrap_or_default().to_string(),
                password: words.next().unwrap_or_default().to_string(),
            }),
            Some("/quit") => Ok(Self::Quit),
            Some("/help") => Ok(Self::Help),
            other => Err(CommandError::Unknown(other.unwrap_or_default().to_string())),
        }
    }

    /// Intents this command stands for, in order.
    pub fn into_intents(self) -> Vec<Intent> {
        match self {
            Self::Login { username, password } => vec![Intent::SubmitLogin { username, password }],
            Self::Quit => vec![Intent::Quit],
            Self::Say(text) => vec![Intent::EditCompose(text), Intent::SubmitMessage],
            Self::Help | Self::Empty => vec![],
        }
    }
}
