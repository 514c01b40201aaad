//! The run state machine of one editing surface.
//!
//! A run moves `Idle → Validating → (AwaitingInput) → Submitting` and ends in
//! `Succeeded`, `Failed` or `NeedsInput`. The orchestrator can be driven in two
//! ways:
//!
//! - step by step, for hosts that own the network call: [`RunOrchestrator::prepare`],
//!   [`RunOrchestrator::supply_input`] and [`RunOrchestrator::complete`];
//! - end to end through its [`ExecutionBackend`]: [`RunOrchestrator::run`] and
//!   [`RunOrchestrator::run_with_input`].
//!
//! Every submission carries a monotonic request id. A completion whose id is
//! not the one currently `Submitting` is discarded.

use std::sync::Arc;

use serde::Serialize;

use crate::decorate::{DecorationBridge, EditorSurface, ErrorLocation, ErrorLocator};
use crate::detect::{InputDetector, InputRequirement};
use crate::error::{TransportError, ValidationError};
use crate::language::LanguageId;

use super::backend::ExecutionBackend;
use super::context::AbortHandle;
use super::notify::{Notification, NotificationLevel, NotificationSink};
use super::types::{ExecutionRequest, ExecutionResult};

/// Resubmissions allowed after the runner reports missing input.
pub const DEFAULT_MAX_INPUT_ROUNDS: u32 = 3;

/// Where a surface's current run stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// No run, or the last run was abandoned.
    Idle,

    /// Checking the request before anything is sent.
    Validating,

    /// The program reads input; waiting for the user to supply stdin.
    AwaitingInput { requirement: InputRequirement },

    /// A request is in flight.
    Submitting { request_id: u64 },

    /// The program ran to completion.
    Succeeded {
        /// Output with trailing newlines removed.
        output: String,
        runtime_ms: Option<u64>,
        exit_code: Option<i32>,
    },

    /// The program failed, or the runner could not be reached.
    Failed {
        message: String,
        formatted: Option<String>,
        location: Option<ErrorLocation>,
    },

    /// The runner says the program needed input it did not get.
    NeedsInput { hint: Option<String> },
}

impl RunState {
    /// Short name for logs and status lines.
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Validating => "validating",
            RunState::AwaitingInput { .. } => "awaiting_input",
            RunState::Submitting { .. } => "submitting",
            RunState::Succeeded { .. } => "succeeded",
            RunState::Failed { .. } => "failed",
            RunState::NeedsInput { .. } => "needs_input",
        }
    }

    /// Whether the submission attempt has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded { .. } | RunState::Failed { .. } | RunState::NeedsInput { .. }
        )
    }
}

/// What the host should do after [`RunOrchestrator::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStep {
    /// Collect stdin, then call [`RunOrchestrator::supply_input`].
    AwaitingInput(InputRequirement),

    /// Send the request and report back through [`RunOrchestrator::complete`].
    Submit(Submission),
}

/// A request handed out for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub request: ExecutionRequest,
}

/// Code and language of the run in progress.
#[derive(Debug, Clone)]
struct ActiveRun {
    code: String,
    language: LanguageId,
    requirement: InputRequirement,
}

/// Clears the executing flag however the submission ends.
struct ExecutingGuard<'a>(&'a mut bool);

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Drives runs for one editing surface.
pub struct RunOrchestrator<B> {
    backend: B,
    notifier: Arc<dyn NotificationSink>,
    detector: InputDetector<'static>,
    locator: ErrorLocator<'static>,
    bridge: DecorationBridge,

    state: RunState,
    run: Option<ActiveRun>,

    /// True while a submission is in flight
    executing: bool,
    last_stdin_used: Option<String>,
    next_request_id: u64,

    input_rounds: u32,
    max_input_rounds: u32,

    abort: AbortHandle,
}

impl<B: ExecutionBackend> RunOrchestrator<B> {
    pub fn new(backend: B, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            backend,
            notifier,
            detector: InputDetector::default(),
            locator: ErrorLocator::default(),
            bridge: DecorationBridge::new(),
            state: RunState::Idle,
            run: None,
            executing: false,
            last_stdin_used: None,
            next_request_id: 1,
            input_rounds: 0,
            max_input_rounds: DEFAULT_MAX_INPUT_ROUNDS,
            abort: AbortHandle::new(),
        }
    }

    /// Limit how often a run may go back for more input.
    pub fn with_max_input_rounds(mut self, rounds: u32) -> Self {
        self.max_input_rounds = rounds;
        self
    }

    /// Use a custom error locator (e.g. one with a line offset).
    pub fn with_locator(mut self, locator: ErrorLocator<'static>) -> Self {
        self.locator = locator;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Stdin sent with the latest submission of the current run.
    pub fn last_stdin_used(&self) -> Option<&str> {
        self.last_stdin_used.as_deref()
    }

    /// Times the runner asked for more input during the current run.
    pub fn input_rounds(&self) -> u32 {
        self.input_rounds
    }

    /// The highlight currently shown, if any.
    pub fn highlighted(&self) -> Option<ErrorLocation> {
        self.bridge.active()
    }

    /// A handle the host can use to abandon the in-flight submission.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start a run.
    ///
    /// Fails fast, leaving the machine `Idle`, when the code is blank or the
    /// language has no runtime. Blank `stdin` counts as not supplied.
    pub fn prepare(
        &mut self,
        editor: &mut dyn EditorSurface,
        code: &str,
        language: LanguageId,
        stdin: Option<&str>,
    ) -> Result<RunStep, ValidationError> {
        if self.executing {
            return Err(ValidationError::AlreadyExecuting);
        }
        if let RunState::Submitting { request_id } = self.state {
            tracing::debug!("request {} was abandoned before completing", request_id);
        }

        self.bridge.clear(editor);
        self.last_stdin_used = None;
        self.input_rounds = 0;
        self.abort.reset();
        self.run = None;
        self.state = RunState::Validating;

        if code.trim().is_empty() {
            return Err(self.reject(ValidationError::EmptyCode));
        }
        if language.runtime().is_none() {
            return Err(self.reject(ValidationError::NoRuntime(language.name().to_string())));
        }

        let requirement = self.detector.detect(code, &language);
        self.run = Some(ActiveRun {
            code: code.to_string(),
            language,
            requirement: requirement.clone(),
        });

        match stdin.filter(|s| !s.trim().is_empty()) {
            Some(stdin) => self.submit(stdin).map(RunStep::Submit),
            None if requirement.requires_input => {
                tracing::debug!("program expects {} input value(s)", requirement.count);
                self.notify(
                    NotificationLevel::Info,
                    format!(
                        "This program reads input. Provide {} line(s) before running.",
                        requirement.count
                    ),
                );
                self.state = RunState::AwaitingInput {
                    requirement: requirement.clone(),
                };
                Ok(RunStep::AwaitingInput(requirement))
            }
            None => self.submit("").map(RunStep::Submit),
        }
    }

    /// Submit the current run with the stdin the user collected.
    ///
    /// An abort raised while input was being collected does not carry over
    /// to this submission.
    pub fn supply_input(&mut self, stdin: &str) -> Result<Submission, ValidationError> {
        if !matches!(self.state, RunState::AwaitingInput { .. }) {
            return Err(ValidationError::NotAwaitingInput);
        }
        self.abort.reset();
        self.submit(stdin)
    }

    /// The "provide input" action after the runner reported missing input.
    ///
    /// Moves back to `AwaitingInput` and returns what to ask for.
    pub fn provide_input(&mut self) -> Result<InputRequirement, ValidationError> {
        let RunState::NeedsInput { hint } = &self.state else {
            return Err(ValidationError::NotAwaitingInput);
        };
        let detected = self
            .run
            .as_ref()
            .map(|run| run.requirement.clone())
            .unwrap_or_default();

        let mut requirement = InputRequirement {
            requires_input: true,
            count: detected.count.max(1),
            hints: detected.hints,
        };
        if let Some(hint) = hint
            && !requirement.hints.contains(hint)
        {
            requirement.hints.push(hint.clone());
        }

        self.state = RunState::AwaitingInput {
            requirement: requirement.clone(),
        };
        Ok(requirement)
    }

    /// Apply the outcome of submission `id`.
    ///
    /// `None` means the call was aborted: nothing is applied and the machine
    /// returns to `Idle`. Results for any other request are ignored.
    pub fn complete(
        &mut self,
        editor: &mut dyn EditorSurface,
        id: u64,
        outcome: Option<Result<ExecutionResult, TransportError>>,
    ) -> &RunState {
        match self.state {
            RunState::Submitting { request_id } if request_id == id => {}
            _ => {
                tracing::debug!("discarding stale result for request {}", id);
                return &self.state;
            }
        }
        self.executing = false;

        match outcome {
            None => {
                tracing::debug!("request {} aborted", id);
                self.state = RunState::Idle;
            }
            Some(Err(err)) => {
                tracing::warn!("request {} failed in transport: {}", id, err);
                let failure = ExecutionResult::transport_failure(&err);
                self.apply(editor, failure, false);
            }
            Some(Ok(result)) => self.apply(editor, result, true),
        }
        &self.state
    }

    /// Abandon the current submission, if any.
    pub fn cancel(&mut self) {
        self.abort.abort();
        if let RunState::Submitting { request_id } = self.state {
            tracing::debug!("request {} cancelled", request_id);
            self.state = RunState::Idle;
        }
        self.executing = false;
    }

    /// The user edited the source.
    pub fn on_source_edited(&mut self, editor: &mut dyn EditorSurface) {
        self.bridge.on_source_edited(editor);
    }

    /// The user picked another language.
    pub fn on_language_changed(&mut self, editor: &mut dyn EditorSurface) {
        self.bridge.on_language_changed(editor);
    }

    /// Run `code` through the backend.
    ///
    /// Returns in `AwaitingInput` without submitting when the program reads
    /// input and no stdin was given.
    pub async fn run(
        &mut self,
        editor: &mut dyn EditorSurface,
        code: &str,
        language: LanguageId,
        stdin: Option<&str>,
    ) -> Result<&RunState, ValidationError> {
        match self.prepare(editor, code, language, stdin)? {
            RunStep::AwaitingInput(_) => Ok(&self.state),
            RunStep::Submit(submission) => Ok(self.dispatch(editor, submission).await),
        }
    }

    /// Resume an `AwaitingInput` run with `stdin`.
    pub async fn run_with_input(
        &mut self,
        editor: &mut dyn EditorSurface,
        stdin: &str,
    ) -> Result<&RunState, ValidationError> {
        let submission = self.supply_input(stdin)?;
        Ok(self.dispatch(editor, submission).await)
    }

    async fn dispatch(&mut self, editor: &mut dyn EditorSurface, submission: Submission) -> &RunState {
        let outcome = {
            let _executing = ExecutingGuard(&mut self.executing);
            let abort = self.abort.clone();
            tokio::select! {
                biased;
                _ = abort.aborted() => None,
                result = self.backend.execute(&submission.request) => Some(result),
            }
        };
        self.complete(editor, submission.id, outcome)
    }

    fn submit(&mut self, stdin: &str) -> Result<Submission, ValidationError> {
        let Some(run) = &self.run else {
            return Err(ValidationError::NotAwaitingInput);
        };

        if run.requirement.requires_input {
            let supplied = stdin.lines().count();
            if supplied != run.requirement.count {
                tracing::debug!(
                    "{} stdin line(s) supplied for {} expected read(s)",
                    supplied,
                    run.requirement.count
                );
            }
        }

        let request = ExecutionRequest::new(run.code.clone(), run.language.clone(), stdin);
        let id = self.next_request_id;
        self.next_request_id += 1;

        self.executing = true;
        self.last_stdin_used = Some(stdin.to_string());
        self.state = RunState::Submitting { request_id: id };
        tracing::debug!("submitting request {} ({})", id, request.language);

        Ok(Submission { id, request })
    }

    fn apply(&mut self, editor: &mut dyn EditorSurface, result: ExecutionResult, locatable: bool) {
        match result {
            ExecutionResult::Success {
                output,
                runtime_ms,
                exit_code,
            } => {
                self.bridge.clear(editor);
                let message = match runtime_ms {
                    Some(ms) => format!("Ran successfully in {ms} ms"),
                    None => "Ran successfully".to_string(),
                };
                self.notify(NotificationLevel::Success, message);
                self.state = RunState::Succeeded {
                    output: output.trim_end_matches(['\n', '\r']).to_string(),
                    runtime_ms,
                    exit_code,
                };
            }
            ExecutionResult::Failure { message, formatted } => {
                let language = self.run.as_ref().map(|run| &run.language);
                let text = formatted.as_deref().unwrap_or(&message);
                let location = match language {
                    Some(language) if locatable => self.locator.locate(text, language),
                    _ => None,
                };

                let location = match location {
                    Some(location) => {
                        self.bridge.highlight(editor, location);
                        self.bridge.active()
                    }
                    None => {
                        self.bridge.clear(editor);
                        None
                    }
                };

                self.notify(NotificationLevel::Error, message.clone());
                self.state = RunState::Failed {
                    message,
                    formatted,
                    location,
                };
            }
            ExecutionResult::NeedsInput { hint } => {
                self.input_rounds += 1;
                if self.input_rounds > self.max_input_rounds {
                    let message = format!(
                        "The program kept asking for more input after {} attempts",
                        self.max_input_rounds
                    );
                    tracing::warn!("{}", message);
                    self.bridge.clear(editor);
                    self.notify(NotificationLevel::Error, message.clone());
                    self.state = RunState::Failed {
                        message,
                        formatted: None,
                        location: None,
                    };
                    return;
                }

                let message = match &hint {
                    Some(hint) => format!("The program needs input: {hint}"),
                    None => "The program needs input".to_string(),
                };
                self.notify(NotificationLevel::Warning, message);
                self.state = RunState::NeedsInput { hint };
            }
        }
    }

    fn reject(&mut self, err: ValidationError) -> ValidationError {
        tracing::debug!("run rejected: {}", err);
        self.notify(NotificationLevel::Warning, err.to_string());
        self.state = RunState::Idle;
        err
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.notifier.notify(Notification::new(level, message));
    }
}
