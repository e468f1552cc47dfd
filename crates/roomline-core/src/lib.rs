//! Core state machines for roomline.
//!
//! Two Sans-IO state machines drive the chat client. They consume events
//! describing what happened (a backend reply, a connectivity change, a
//! notification) and return actions describing what should happen next. The
//! caller owns all I/O, so the same code runs against a real backend and in
//! deterministic tests.
//!
//! # Components
//!
//! - [`Session`]: connectivity and authentication lifecycle (resources,
//!   connect, token restore, verification, refresh, login, expiry)
//! - [`ChatRoom`]: message list synchronization (history, realtime
//!   subscription, send)
//! - [`Message`]: immutable chat entry ordered by server creation time
//! - [`Notice`]: user-visible report of a failure or state change

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chat;
mod message;
mod notice;
pub mod session;

pub use chat::{ChatAction, ChatEvent, ChatRoom, HISTORY_PAGE_SIZE, SubscriptionId};
pub use message::{DATE_FORMAT, Message};
pub use notice::{Notice, Severity};
pub use session::{
    Connectivity, LOGIN_STRATEGY, LoginForm, REFRESH_EXPIRY, Session, SessionAction, SessionEvent,
    SessionPhase, TokenVerification,
};
