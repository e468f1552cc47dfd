//! Line driver over a reader and a writer.

use std::{
    collections::VecDeque,
    io::{self, Write},
};

use roomline_app::{Driver, Intent, ViewState};
use roomline_core::Notice;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{Command, HELP, Renderer};

/// Line driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// [`Driver`] that reads commands line by line and prints what changed.
///
/// Output goes through a blocking writer: lines are short and the runtime
/// renders between inputs, never while waiting on one.
pub struct LineDriver<R, W> {
    input: Lines<R>,
    output: W,
    renderer: Renderer,
    /// Intents parsed from a line but not yet handed out.
    pending: VecDeque<Intent>,
}

impl<R, W> LineDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver reading from `input` and printing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input: input.lines(), output, renderer: Renderer::new(), pending: VecDeque::new() }
    }

    /// Consume the driver, returning the writer.
    pub fn into_output(self) -> W {
        self.output
    }

    fn print(&mut self, text: &str) -> Result<(), DriverError> {
        writeln!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }
}

impl<R, W> Driver for LineDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = DriverError;

    async fn load_resources(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn render(&mut self, view: &ViewState) -> Result<(), DriverError> {
        for line in self.renderer.render(view) {
            writeln!(self.output, "{line}")?;
        }
        self.output.flush()?;
        Ok(())
    }

    // `Lines::next_line` is cancel-safe and nothing else is awaited.
    async fn next_intent(&mut self) -> Result<Option<Intent>, DriverError> {
        loop {
            if let Some(intent) = self.pending.pop_front() {
                return Ok(Some(intent));
            }

            let Some(line) = self.input.next_line().await? else {
                return Ok(None);
            };
            match Command::parse(&line) {
                Ok(Command::Help) => self.print(HELP)?,
                Ok(command) => self.pending.extend(command.into_intents()),
                Err(e) => self.print(&e.to_string())?,
            }
        }
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), DriverError> {
        self.print(&notice.to_string())
    }
}
