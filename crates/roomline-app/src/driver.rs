//! Driver trait for abstracting presentation I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific front end. Each
//! front end implements it, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::future::Future;

use roomline_core::Notice;

use crate::{Intent, ViewState};

/// Abstracts presentation I/O for the application runtime.
///
/// # Implementations
///
/// - **CLI**: line-oriented stdin/stdout (roomline-cli)
/// - **Scripted**: replays intents and records renders (roomline-harness)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Load fonts, assets or whatever the front end needs before the first
    /// real screen.
    ///
    /// A failure is reported to the user but does not stop the runtime.
    fn load_resources(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Render the current view.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is gone. This stops the runtime.
    fn render(&mut self, view: &ViewState) -> Result<(), Self::Error>;

    /// Wait for the next user intent. `None` once input is exhausted.
    ///
    /// Must be cancel-safe: the runtime races it against backend events and
    /// drops it when they win.
    fn next_intent(&mut self) -> impl Future<Output = Result<Option<Intent>, Self::Error>> + Send;

    /// Show a notice to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is gone. This stops the runtime.
    fn notify(&mut self, notice: &Notice) -> Result<(), Self::Error>;
}
