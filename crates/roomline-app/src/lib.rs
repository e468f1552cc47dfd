//! Application layer for roomline
//!
//! Composes the session and chat state machines into one [`App`] and drives
//! it with a generic async [`Runtime`], so the same orchestration runs in the
//! terminal client and in scenario tests.
//!
//! # Components
//!
//! - [`App`]: composition of `Session` and `ChatRoom`, user intents, view
//! - [`Driver`]: trait for presentation I/O (rendering, intents, notices)
//! - [`Runtime`]: orchestration loop over a backend, a credential store and a
//!   driver
//! - [`RuntimeConfig`]: call timeout, page size, token key, collection

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod config;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use config::RuntimeConfig;
pub use driver::Driver;
pub use event::AppEvent;
pub use input::Intent;
pub use runtime::{Runtime, RuntimeError};
pub use state::{MAX_NOTICES, ViewState};
