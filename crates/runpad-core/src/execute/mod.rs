//! Running code on the external execution service.
//!
//! [`RunOrchestrator`] sequences validation, input collection, submission and
//! result handling for one editing surface. The service itself sits behind
//! [`ExecutionBackend`]; [`HttpExecutionBackend`] is the JSON-over-HTTP client.

mod backend;
mod context;
mod notify;
mod orchestrator;
mod types;

pub use backend::{ExecutionBackend, HttpExecutionBackend};
pub use context::AbortHandle;
pub use notify::{BroadcastNotifier, Notification, NotificationLevel, NotificationSink, NullNotifier};
pub use orchestrator::{DEFAULT_MAX_INPUT_ROUNDS, RunOrchestrator, RunState, RunStep, Submission};
pub use types::{
    ExecutionRequest, ExecutionResult, TIMEOUT_SECONDS, TRANSPORT_FAILURE_MESSAGE, WireRequest,
    WireResponse,
};
