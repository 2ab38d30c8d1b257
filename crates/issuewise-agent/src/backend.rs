//! LLM backend trait and shared helpers.
//!
//! This module defines the abstraction layer for language model providers
//! (hosted chat APIs, local text-generation servers) and provides a mock
//! implementation for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::types::{
    CompletionRequest, CompletionResponse, ContentBlock, StopReason, ToolDefinition, Usage,
};

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures). Non-retryable errors
/// are returned immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;
    let mut backoff = initial_backoff;

    for attempt in 0..=max_retries {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }

                last_error = Some(e);

                if attempt < max_retries {
                    tracing::warn!(
                        backend = backend_name,
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    Err(last_error.unwrap())
}

/// Check if an error is retryable.
///
/// Only network errors are considered retryable. Config, serialization,
/// and other errors should not be retried.
pub fn is_retryable(error: &AgentError) -> bool {
    matches!(error, AgentError::Network(_))
}

/// Trait for LLM backend providers.
///
/// Two capabilities: completing a conversation and binding a tool set.
/// Backends that support native tool calling receive tool definitions on
/// each request and return structured tool-use blocks; backends that do not
/// (the local text-generation variant) record the bound tools without
/// altering generation - the agent engine checks `supports_native_tools()`
/// and sends no tool definitions down that path.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Record the tool set this backend may be asked to use.
    fn bind_tools(&mut self, tools: Vec<ToolDefinition>);

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Returns true if the backend handles tools natively via its API.
    fn supports_native_tools(&self) -> bool {
        false
    }
}

/// A backend that can be shared across components.
pub type SharedBackend = Arc<dyn LlmBackend>;

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order and logs every request, useful
/// for deterministic testing of the agent engine.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: std::sync::Mutex<Vec<CompletionResponse>>,
    request_log: std::sync::Mutex<Vec<CompletionRequest>>,
    bound_tools: std::sync::Mutex<Vec<ToolDefinition>>,
}

impl MockBackend {
    /// Create a new mock backend with the given responses.
    ///
    /// Responses are returned in order. If more requests are made than
    /// responses available, an error is returned.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: std::sync::Mutex::new(responses),
            request_log: std::sync::Mutex::new(Vec::new()),
            bound_tools: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse::new(
            "mock_msg_1",
            "mock-model",
            vec![ContentBlock::text(text)],
            StopReason::EndTurn,
            Usage::new(10, 20),
        )])
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }

    /// Get the tools most recently bound to this backend.
    pub fn bound_tools(&self) -> Vec<ToolDefinition> {
        self.bound_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.request_log.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(AgentError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }

    fn bind_tools(&mut self, tools: Vec<ToolDefinition>) {
        *self.bound_tools.lock().unwrap() = tools;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn supports_native_tools(&self) -> bool {
        true
    }
}
