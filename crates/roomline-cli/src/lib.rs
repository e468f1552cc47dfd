//! Line-oriented terminal front end for roomline.
//!
//! Reads commands from a line reader, prints notices and new messages to a
//! writer, and implements [`roomline_app::Driver`] so the shared runtime can
//! drive it.
//!
//! # Components
//!
//! - [`Command`]: one parsed input line
//! - [`Renderer`]: turns successive views into the lines that changed
//! - [`LineDriver`]: the [`roomline_app::Driver`] over a reader and a writer

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod driver;
mod render;

pub use command::{Command, CommandError, HELP};
pub use driver::{DriverError, LineDriver};
pub use render::{Renderer, Screen, format_message};
