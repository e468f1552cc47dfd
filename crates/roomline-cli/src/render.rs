//! Incremental line rendering.
//!
//! A terminal that scrolls cannot redraw, so [`Renderer`] remembers what it
//! already printed and emits only what changed between two views.

use std::collections::HashSet;

use roomline_app::ViewState;
use roomline_core::{Connectivity, LoginForm, Message};

/// Screen a view corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Bootstrap in progress.
    Loading,
    /// Login form.
    Login,
    /// Message list and compose field.
    Chat,
}

impl Screen {
    /// Screen `view` should be shown on.
    pub fn of(view: &ViewState) -> Self {
        if view.loading {
            Self::Loading
        } else if view.logged_in {
            Self::Chat
        } else {
            Self::Login
        }
    }
}

/// Turns successive views into the lines to print.
#[derive(Debug, Default)]
pub struct Renderer {
    screen: Option<Screen>,
    connectivity: Option<Connectivity>,
    username: Option<String>,
    login_form: LoginForm,
    shown: HashSet<String>,
}

impl Renderer {
    /// Create a renderer that has printed nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines describing what changed since the previous view.
    pub fn render(&mut self, view: &ViewState) -> Vec<String> {
        let mut lines = Vec::new();

        if self.connectivity.is_some_and(|previous| previous != view.connectivity) {
            lines.push(match view.connectivity {
                Connectivity::Connected => "-- connected --".to_string(),
                Connectivity::Disconnected => "-- connection lost --".to_string(),
            });
        }
        self.connectivity = Some(view.connectivity);

        let screen = Screen::of(view);
        if self.screen != Some(screen) {
            self.screen = Some(screen);
            self.username = None;
            self.login_form = LoginForm::default();
            self.shown.clear();
            lines.push(
                match screen {
                    Screen::Loading => "Loading...",
                    Screen::Login => "Log in with /login NAME PASSWORD",
                    Screen::Chat => "Joined the chat. Type a message and press enter, /quit to leave.",
                }
                .to_string(),
            );
        }

        match screen {
            Screen::Loading => {},
            Screen::Login => {
                if view.login_form != self.login_form {
                    self.login_form = view.login_form;
                    if view.login_form.username_missing {
                        lines.push("Username is required.".to_string());
                    }
                    if view.login_form.password_missing {
                        lines.push("Password is required.".to_string());
                    }
                }
            },
            Screen::Chat => {
                if let Some(username) = &view.username
                    && self.username.as_ref() != Some(username)
                {
                    self.username = Some(username.clone());
                    lines.push(format!("Signed in as {username}."));
                }
                for message in &view.messages {
                    if self.shown.insert(message.id.clone()) {
                        lines.push(format_message(message, view.username.as_deref()));
                    }
                }
            },
        }

        lines
    }
}

/// One message line. Messages written by `me` are marked.
pub fn format_message(message: &Message, me: Option<&str>) -> String {
    let marker = if message.is_from(me) { " (you)" } else { "" };
    format!("[{}] {}{marker}: {}", message.date(), message.author, message.text)
}
