//! Application state machine.
//!
//! [`App`] owns one [`Session`] and, while the user is logged in, one
//! [`ChatRoom`]. It routes events to their machine, lifts rendering and
//! notices out of the machines' actions, and keeps the room in step with the
//! session after every session transition.
//!
//! This is a pure state machine: it consumes [`AppEvent`]s and [`Intent`]s
//! and produces [`AppAction`]s for the runtime to execute.

use std::collections::VecDeque;

use roomline_core::{
    ChatAction, ChatEvent, ChatRoom, Notice, Session, SessionAction, SessionEvent,
};

use crate::{AppAction, AppEvent, Intent, MAX_NOTICES, ViewState};

/// Application state machine.
#[derive(Debug, Clone)]
pub struct App {
    session: Session,
    /// Present exactly while the session is logged in.
    room: Option<ChatRoom>,
    history_page_size: usize,
    notices: VecDeque<Notice>,
}

impl App {
    /// Create an App whose rooms fetch `history_page_size` messages.
    pub fn new(history_page_size: usize) -> Self {
        Self {
            session: Session::new(),
            room: None,
            history_page_size,
            notices: VecDeque::new(),
        }
    }

    /// Begin bootstrap.
    pub fn start(&mut self) -> Vec<AppAction> {
        let actions = self.session.start();
        self.lift_session(actions)
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Session(event) => {
                let connected = matches!(event, SessionEvent::Connected | SessionEvent::Reconnected);
                let actions = self.session.handle(event);
                let mut actions = self.lift_session(actions);
                actions.extend(self.sync_room());
                if connected && let Some(room) = self.room.as_mut() {
                    let resumed = room.resume();
                    actions.extend(self.lift_chat(resumed));
                }
                actions
            },
            AppEvent::Chat(event) => match self.room.as_mut() {
                Some(room) => {
                    let actions = room.handle(event);
                    self.lift_chat(actions)
                },
                // The room that asked for this subscription is gone.
                None => match event {
                    ChatEvent::Subscribed(id) => vec![AppAction::Chat(ChatAction::Unsubscribe(id))],
                    _ => vec![],
                },
            },
        }
    }

    /// Apply a user intent.
    pub fn apply(&mut self, intent: Intent) -> Vec<AppAction> {
        match intent {
            Intent::SubmitLogin { username, password } => {
                let actions = self.session.submit_login(&username, &password);
                self.lift_session(actions)
            },
            Intent::EditCompose(text) => match self.room.as_mut() {
                Some(room) => {
                    room.set_compose(text);
                    vec![AppAction::Render]
                },
                None => vec![],
            },
            Intent::SubmitMessage => match self.room.as_mut() {
                Some(room) => {
                    let actions = room.submit();
                    self.lift_chat(actions)
                },
                None => vec![],
            },
            Intent::Quit => {
                let mut actions = self.close_room();
                actions.push(AppAction::Quit);
                actions
            },
        }
    }

    /// Record a notice raised outside the two machines.
    pub fn push_notice(&mut self, notice: Notice) -> Vec<AppAction> {
        self.enqueue(notice.clone());
        vec![AppAction::Notify(notice), AppAction::Render]
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> ViewState {
        let room = self.room.as_ref();
        ViewState {
            connectivity: self.session.connectivity(),
            loading: self.session.is_loading(),
            logged_in: self.session.is_logged_in(),
            username: self.session.authenticated_user().map(str::to_string),
            messages: room.map(|r| r.messages().to_vec()).unwrap_or_default(),
            compose_text: room.map(|r| r.compose().to_string()).unwrap_or_default(),
            login_form: self.session.login_form(),
            notices: self.notices.iter().cloned().collect(),
        }
    }

    /// Drain retained notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Session state machine.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Chat room. `None` unless logged in.
    pub fn room(&self) -> Option<&ChatRoom> {
        self.room.as_ref()
    }

    /// Open, update or close the room to match the session.
    fn sync_room(&mut self) -> Vec<AppAction> {
        if !self.session.is_logged_in() {
            return self.close_room();
        }

        let username = self.session.authenticated_user().map(str::to_string);
        match self.room.as_mut() {
            Some(room) => {
                if username.is_some() && room.username() != username.as_deref() {
                    room.set_username(username);
                }
                vec![]
            },
            None => {
                let mut room = ChatRoom::new(username, self.history_page_size);
                let actions = room.open();
                self.room = Some(room);
                self.lift_chat(actions)
            },
        }
    }

    fn close_room(&mut self) -> Vec<AppAction> {
        match self.room.take() {
            Some(mut room) => {
                let actions = room.close();
                self.lift_chat(actions)
            },
            None => vec![],
        }
    }

    fn lift_session(&mut self, actions: Vec<SessionAction>) -> Vec<AppAction> {
        actions
            .into_iter()
            .map(|action| match action {
                SessionAction::Render => AppAction::Render,
                SessionAction::Notify(notice) => self.lift_notice(notice),
                other => AppAction::Session(other),
            })
            .collect()
    }

    fn lift_chat(&mut self, actions: Vec<ChatAction>) -> Vec<AppAction> {
        actions
            .into_iter()
            .map(|action| match action {
                ChatAction::Render => AppAction::Render,
                ChatAction::Notify(notice) => self.lift_notice(notice),
                other => AppAction::Chat(other),
            })
            .collect()
    }

    fn lift_notice(&mut self, notice: Notice) -> AppAction {
        self.enqueue(notice.clone());
        AppAction::Notify(notice)
    }

    fn enqueue(&mut self, notice: Notice) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }
}
