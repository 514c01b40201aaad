//! Error types for runpad-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for runpad-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Problems caught before a run ever reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Source code is empty or whitespace-only.
    #[error("there is no code to run")]
    EmptyCode,

    /// The language is known but has no executable runtime.
    #[error("{0} cannot be executed by the code runner")]
    NoRuntime(String),

    /// A custom language name failed the name check.
    #[error("\"{name}\" is not a valid language name: {reason}")]
    InvalidLanguage { name: String, reason: String },

    /// A submission is already in flight for this surface.
    #[error("a run is already in progress")]
    AlreadyExecuting,

    /// Input was supplied while the run was not waiting for any.
    #[error("the current run is not waiting for input")]
    NotAwaitingInput,

    /// A draft key was empty.
    #[error("draft key must not be empty")]
    EmptyDraftKey,
}

/// Failures talking to the execution service.
///
/// These never escape the orchestrator: they are folded into a failed run
/// with a generic message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success HTTP status.
    #[error("runner responded with HTTP {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Failures of the draft storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage IO error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Stored bytes could not be encoded or decoded.
    #[error("draft serialization error: {0}")]
    Serialization(String),

    /// Storage is switched off or unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Errors that can occur in runpad-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Local validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Execution service unreachable or misbehaving.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Draft storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Render the error together with a short recovery hint for terminal output.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::Validation(ValidationError::EmptyCode) => Some("write some code first"),
            Error::Validation(ValidationError::NoRuntime(_)) => {
                Some("pick one of the built-in languages, e.g. python or javascript")
            }
            Error::Validation(ValidationError::InvalidLanguage { .. }) => {
                Some("use the language's usual name, e.g. \"dart\" or \"scala\"")
            }
            Error::Validation(ValidationError::AlreadyExecuting) => {
                Some("wait for the current run to finish")
            }
            Error::Validation(ValidationError::NotAwaitingInput) => None,
            Error::Validation(ValidationError::EmptyDraftKey) => {
                Some("name the draft, e.g. \"scratch\"")
            }
            Error::Transport(_) => Some("check that the code runner is up and the URL is right"),
            Error::Storage(_) | Error::Io(_) => Some("check permissions on the drafts directory"),
        };

        match hint {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}
