//! Scripted driver for scenario tests.
//!
//! Replays a [`Script`] in place of a user. Waits are checked against the
//! most recent render, and every render and notice is recorded so a test can
//! assert on what a user would have seen.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use roomline_app::{Driver, Intent, ViewState};
use roomline_core::Notice;
use thiserror::Error;
use tokio::time::Instant;

use crate::invariants::{InvariantRegistry, SystemSnapshot, Violation};

/// How long a wait step may take before the script fails.
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised by a [`ScriptedDriver`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A wait step's condition never held.
    #[error("timed out after {waited:?} waiting for {description}")]
    WaitTimedOut {
        /// What the step waited for.
        description: &'static str,
        /// How long it waited.
        waited: Duration,
    },

    /// Resource loading was configured to fail.
    #[error("resources unavailable: {0}")]
    ResourcesUnavailable(String),
}

type Predicate = Box<dyn Fn(&ViewState) -> bool + Send>;

enum Step {
    Intent(Intent),
    WaitFor { description: &'static str, predicate: Predicate, deadline: Option<Instant> },
    Run(Box<dyn FnOnce() + Send>),
    Sleep { duration: Duration, deadline: Option<Instant> },
}

/// Ordered user behaviour for a [`ScriptedDriver`].
///
/// When the script runs out the driver reports end of input and the runtime
/// shuts down.
pub struct Script {
    steps: VecDeque<Step>,
    wait_timeout: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl Script {
    /// Create an empty script.
    pub fn new() -> Self {
        Self { steps: VecDeque::new(), wait_timeout: DEFAULT_WAIT_TIMEOUT }
    }

    /// Emit `intent`.
    pub fn intent(mut self, intent: Intent) -> Self {
        self.steps.push_back(Step::Intent(intent));
        self
    }

    /// Submit the login form.
    pub fn login(self, username: &str, password: &str) -> Self {
        self.intent(Intent::SubmitLogin {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Type `text` into the compose field and submit it.
    pub fn send(self, text: &str) -> Self {
        self.intent(Intent::EditCompose(text.to_string())).intent(Intent::SubmitMessage)
    }

    /// Block until a render satisfies `predicate`.
    pub fn wait_for(
        mut self,
        description: &'static str,
        predicate: impl Fn(&ViewState) -> bool + Send + 'static,
    ) -> Self {
        self.steps.push_back(Step::WaitFor {
            description,
            predicate: Box::new(predicate),
            deadline: None,
        });
        self
    }

    /// Run `action`, typically to poke the server.
    pub fn run(mut self, action: impl FnOnce() + Send + 'static) -> Self {
        self.steps.push_back(Step::Run(Box::new(action)));
        self
    }

    /// Idle for `duration`, letting the runtime process whatever arrives.
    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push_back(Step::Sleep { duration, deadline: None });
        self
    }

    /// Fail wait steps that take longer than `timeout`.
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }
}

#[derive(Default)]
struct RecordingState {
    renders: Vec<ViewState>,
    notices: Vec<Notice>,
    violations: Vec<Violation>,
}

/// Everything a [`ScriptedDriver`] observed. Clones share the recording, so
/// a test keeps one after the driver moves into the runtime.
#[derive(Clone, Default)]
pub struct Recording {
    state: Arc<Mutex<RecordingState>>,
}

impl Recording {
    /// Every rendered view, in order.
    pub fn renders(&self) -> Vec<ViewState> {
        self.lock().renders.clone()
    }

    /// Most recently rendered view.
    pub fn last_view(&self) -> Option<ViewState> {
        self.lock().renders.last().cloned()
    }

    /// Every notice shown, in order.
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    /// Text of every notice shown, in order.
    pub fn notice_messages(&self) -> Vec<String> {
        self.lock().notices.iter().map(|n| n.message.clone()).collect()
    }

    /// Invariant violations found in rendered views.
    pub fn violations(&self) -> Vec<Violation> {
        self.lock().violations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`Driver`] that replays a [`Script`] and records what it is shown.
pub struct ScriptedDriver {
    steps: VecDeque<Step>,
    wait_timeout: Duration,
    recording: Recording,
    last_view: Option<ViewState>,
    resources_failure: Option<String>,
    invariants: Option<InvariantRegistry>,
}

impl ScriptedDriver {
    /// Create a driver that replays `script`.
    pub fn new(script: Script) -> Self {
        Self {
            steps: script.steps,
            wait_timeout: script.wait_timeout,
            recording: Recording::default(),
            last_view: None,
            resources_failure: None,
            invariants: None,
        }
    }

    /// Make resource loading fail with `reason`.
    pub fn fail_resources(mut self, reason: impl Into<String>) -> Self {
        self.resources_failure = Some(reason.into());
        self
    }

    /// Check the standard invariants against every rendered view and record
    /// violations.
    pub fn check_invariants(mut self) -> Self {
        self.invariants = Some(InvariantRegistry::standard());
        self
    }

    /// Shared handle to what this driver observes.
    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

impl Driver for ScriptedDriver {
    type Error = ScriptError;

    async fn load_resources(&mut self) -> Result<(), ScriptError> {
        match &self.resources_failure {
            Some(reason) => Err(ScriptError::ResourcesUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn render(&mut self, view: &ViewState) -> Result<(), ScriptError> {
        let mut recording = self.recording.lock();
        if let Some(registry) = &self.invariants
            && let Err(violations) = registry.check_all(&SystemSnapshot::from_view(view))
        {
            for violation in &violations {
                tracing::error!(%violation, "invariant violated in rendered view");
            }
            recording.violations.extend(violations);
        }
        recording.renders.push(view.clone());
        self.last_view = Some(view.clone());
        Ok(())
    }

    // Cancel-safety: a step is either fully consumed before the next await
    // or pushed back with its deadline recorded.
    async fn next_intent(&mut self) -> Result<Option<Intent>, ScriptError> {
        loop {
            let Some(step) = self.steps.pop_front() else {
                tracing::debug!("script exhausted");
                return Ok(None);
            };

            match step {
                Step::Intent(intent) => return Ok(Some(intent)),
                Step::Run(action) => action(),
                Step::Sleep { duration, deadline } => {
                    let deadline = deadline.unwrap_or_else(|| Instant::now() + duration);
                    self.steps.push_front(Step::Sleep { duration, deadline: Some(deadline) });
                    tokio::time::sleep_until(deadline).await;
                    self.steps.pop_front();
                },
                Step::WaitFor { description, predicate, deadline } => {
                    if self.last_view.as_ref().is_some_and(|view| predicate(view)) {
                        tracing::debug!(description, "wait satisfied");
                        continue;
                    }

                    let deadline = deadline.unwrap_or_else(|| Instant::now() + self.wait_timeout);
                    if Instant::now() >= deadline {
                        return Err(ScriptError::WaitTimedOut {
                            description,
                            waited: self.wait_timeout,
                        });
                    }
                    self.steps.push_front(Step::WaitFor {
                        description,
                        predicate,
                        deadline: Some(deadline),
                    });
                    // Only a render can satisfy the wait, and renders happen
                    // after this future is dropped.
                    tokio::time::sleep_until(deadline).await;
                },
            }
        }
    }

    fn notify(&mut self, notice: &Notice) -> Result<(), ScriptError> {
        self.recording.lock().notices.push(notice.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use roomline_core::{Connectivity, LoginForm};

    use super::*;

    fn view(logged_in: bool) -> ViewState {
        ViewState {
            connectivity: Connectivity::Connected,
            loading: false,
            logged_in,
            username: None,
            messages: vec![],
            compose_text: String::new(),
            login_form: LoginForm::default(),
            notices: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn replays_intents_in_order() {
        let mut driver = ScriptedDriver::new(Script::new().send("hi"));

        assert_eq!(driver.next_intent().await, Ok(Some(Intent::EditCompose("hi".into()))));
        assert_eq!(driver.next_intent().await, Ok(Some(Intent::SubmitMessage)));
        assert_eq!(driver.next_intent().await, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_passes_once_render_matches() {
        let script = Script::new().wait_for("chat screen", |v| v.logged_in).intent(Intent::Quit);
        let mut driver = ScriptedDriver::new(script);
        driver.render(&view(false)).unwrap();

        let pending =
            tokio::time::timeout(Duration::from_secs(1), driver.next_intent()).await;
        assert!(pending.is_err(), "wait must block until a matching render");

        driver.render(&view(true)).unwrap();
        assert_eq!(driver.next_intent().await, Ok(Some(Intent::Quit)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out() {
        let script = Script::new()
            .wait_timeout(Duration::from_secs(5))
            .wait_for("chat screen", |v| v.logged_in);
        let mut driver = ScriptedDriver::new(script);
        driver.render(&view(false)).unwrap();

        assert_eq!(
            driver.next_intent().await,
            Err(ScriptError::WaitTimedOut {
                description: "chat screen",
                waited: Duration::from_secs(5)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_steps_execute_before_next_intent() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let script = Script::new().run(move || flag.store(true, Ordering::SeqCst)).intent(Intent::Quit);
        let mut driver = ScriptedDriver::new(script);

        assert_eq!(driver.next_intent().await, Ok(Some(Intent::Quit)));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn configured_resource_failure() {
        let mut driver = ScriptedDriver::new(Script::new()).fail_resources("fonts missing");
        assert_eq!(
            driver.load_resources().await,
            Err(ScriptError::ResourcesUnavailable("fonts missing".into()))
        );
    }

    #[test]
    fn invariant_violations_are_recorded() {
        let mut driver = ScriptedDriver::new(Script::new()).check_invariants();
        let recording = driver.recording();

        let mut bad = view(true);
        bad.loading = true;
        driver.render(&bad).unwrap();

        assert_eq!(recording.renders().len(), 1);
        assert_eq!(recording.violations().len(), 1);
        assert_eq!(recording.violations()[0].invariant, "bootstrap_before_chat");
    }
}
