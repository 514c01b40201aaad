//! Execution requests, results, and their wire format.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::language::LanguageId;

/// Server-side time limit sent with every request, in seconds.
pub const TIMEOUT_SECONDS: u32 = 15;

/// Message shown when the execution service could not be reached.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Could not reach the code runner";

/// One submission to the execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: LanguageId,
    pub stdin: String,
    pub timeout_seconds: u32,
}

impl ExecutionRequest {
    /// Build a request with the fixed [`TIMEOUT_SECONDS`].
    pub fn new(code: impl Into<String>, language: LanguageId, stdin: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language,
            stdin: stdin.into(),
            timeout_seconds: TIMEOUT_SECONDS,
        }
    }

    /// JSON body for the execution service.
    pub fn to_wire<'a>(&'a self, runtime: &'a str) -> WireRequest<'a> {
        WireRequest {
            code: &self.code,
            language: runtime,
            stdin: &self.stdin,
            timeout: self.timeout_seconds,
        }
    }
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The program ran to completion.
    Success {
        output: String,
        runtime_ms: Option<u64>,
        exit_code: Option<i32>,
    },

    /// The program blocked on input that was not supplied.
    NeedsInput { hint: Option<String> },

    /// The program failed, or the service could not be reached.
    Failure {
        message: String,
        formatted: Option<String>,
    },
}

impl ExecutionResult {
    /// Failure for a transport problem. Carries no formatted error.
    pub fn transport_failure(err: &TransportError) -> Self {
        ExecutionResult::Failure {
            message: format!("{TRANSPORT_FAILURE_MESSAGE}: {err}"),
            formatted: None,
        }
    }

    /// Text the error locator should search: the formatted error when present.
    pub fn error_text(&self) -> Option<&str> {
        match self {
            ExecutionResult::Failure { message, formatted } => {
                Some(formatted.as_deref().unwrap_or(message))
            }
            _ => None,
        }
    }
}

/// Request body sent to the execution service.
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub code: &'a str,
    pub language: &'a str,
    pub stdin: &'a str,
    pub timeout: u32,
}

/// Response body of the execution service.
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub runtime_ms: Option<u64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub formatted_error: Option<String>,
    #[serde(default)]
    pub requires_input: Option<bool>,
}

impl From<WireResponse> for ExecutionResult {
    fn from(resp: WireResponse) -> Self {
        if resp.success {
            return ExecutionResult::Success {
                output: resp.output.unwrap_or_default(),
                runtime_ms: resp.runtime_ms,
                exit_code: resp.exit_code,
            };
        }
        if resp.requires_input.unwrap_or(false) {
            return ExecutionResult::NeedsInput { hint: resp.error };
        }

        let message = resp
            .error
            .or_else(|| {
                resp.formatted_error
                    .as_deref()
                    .and_then(|f| f.lines().rev().find(|l| !l.trim().is_empty()))
                    .map(|l| l.trim().to_string())
            })
            .unwrap_or_else(|| "Execution failed".to_string());

        ExecutionResult::Failure {
            message,
            formatted: resp.formatted_error,
        }
    }
}
