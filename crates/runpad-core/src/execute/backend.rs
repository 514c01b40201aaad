//! The external execution service.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::language::LanguageRegistry;

use super::types::{ExecutionRequest, ExecutionResult, TIMEOUT_SECONDS, WireResponse};

/// Grace period on top of the server-side limit before the client gives up.
const TRANSPORT_GRACE: Duration = Duration::from_secs(10);

/// Anything that can execute an [`ExecutionRequest`].
///
/// `Err` means the service could not be asked or did not answer sensibly;
/// a program that failed is `Ok(ExecutionResult::Failure { .. })`.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, TransportError>;
}

/// JSON-over-HTTP client for the execution service.
#[derive(Debug, Clone)]
pub struct HttpExecutionBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExecutionBackend {
    /// Create a client posting to `<base_url>/execute`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECONDS.into()) + TRANSPORT_GRACE)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/execute", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, TransportError> {
        let runtime = LanguageRegistry::global()
            .runtime_for(&request.language)
            .unwrap_or(request.language.name());

        tracing::debug!(
            "POST {} ({}, {} bytes of code, {} bytes of stdin)",
            self.endpoint,
            runtime,
            request.code.len(),
            request.stdin.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request.to_wire(runtime))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let wire: WireResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(wire.into())
    }
}
