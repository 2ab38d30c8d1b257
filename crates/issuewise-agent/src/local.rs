//! Local text-generation backend.
//!
//! Wraps an Ollama-style `/api/generate` endpoint that only understands a
//! flat prompt string. Tool binding is recorded but does not alter
//! generation; the agent engine sees `supports_native_tools() == false` and
//! never sends tool definitions down this path.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::backend::{LlmBackend, with_retry};
use crate::error::{AgentError, Result};
use crate::types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Role, StopReason,
    ToolDefinition, Usage,
};

/// Default local server URL.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model for the local backend.
const DEFAULT_MODEL: &str = "llama3.2";

/// Cap on generated tokens per request.
const NUM_PREDICT: u32 = 512;

/// Configuration for the local backend.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Base URL of the generation server.
    pub base_url: String,

    /// Model to use for completions.
    pub model: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl LocalConfig {
    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Backend for a local Ollama-style generation server.
pub struct LocalBackend {
    client: Client,
    config: LocalConfig,
    bound_tools: Vec<ToolDefinition>,
}

impl LocalBackend {
    /// Create a new local backend with the given configuration.
    pub fn new(config: LocalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            bound_tools: Vec::new(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url)
    }

    /// Tools recorded by [`LlmBackend::bind_tools`]. Never affects generation.
    pub fn bound_tools(&self) -> &[ToolDefinition] {
        &self.bound_tools
    }

    /// Flatten a conversation into a single prompt string.
    ///
    /// The generate API has no concept of structured tool blocks, so any
    /// tool-use or tool-result content is an invalid request here.
    fn render_prompt(request: &CompletionRequest) -> Result<String> {
        let mut prompt = String::new();

        if let Some(ref system) = request.system {
            prompt.push_str(system);
            prompt.push_str("\n\n");
        }

        for m in &request.messages {
            let text = match &m.content {
                Content::Text(s) => s.clone(),
                Content::Blocks(blocks) => {
                    if blocks
                        .iter()
                        .any(|b| !matches!(b, ContentBlock::Text { .. }))
                    {
                        return Err(AgentError::InvalidRequest(
                            "local backend cannot represent tool content blocks".to_string(),
                        ));
                    }
                    m.content.to_text()
                }
            };

            match m.role {
                Role::User => {
                    prompt.push_str("User: ");
                    prompt.push_str(&text);
                    prompt.push('\n');
                }
                Role::Assistant => {
                    prompt.push_str("Assistant: ");
                    prompt.push_str(&text);
                    prompt.push('\n');
                }
            }
        }

        prompt.push_str("Assistant:");
        Ok(prompt)
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let prompt = Self::render_prompt(&request)?;

        let body = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: NUM_PREDICT,
                temperature: request.temperature,
            },
        };

        tracing::debug!(
            model = %body.model,
            prompt_len = body.prompt.len(),
            "Sending generate request"
        );

        let parsed = with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "local",
            || async {
                let response = self.client.post(self.generate_url()).json(&body).send().await?;

                let status = response.status();
                let text = response.text().await?;

                if !status.is_success() {
                    return Err(AgentError::Backend(format!(
                        "Generate request failed with HTTP {}: {}",
                        status, text
                    )));
                }

                let parsed: GenerateResponse = serde_json::from_str(&text)
                    .map_err(|e| AgentError::Serialization(e.to_string()))?;
                Ok(parsed)
            },
        )
        .await?;

        Ok(CompletionResponse::new(
            format!("local_{}", std::process::id()),
            self.config.model.clone(),
            vec![ContentBlock::text(parsed.response)],
            StopReason::EndTurn,
            Usage::new(
                parsed.prompt_eval_count.unwrap_or(0),
                parsed.eval_count.unwrap_or(0),
            ),
        ))
    }

    /// Recorded only. Generation is unchanged on this backend.
    fn bind_tools(&mut self, tools: Vec<ToolDefinition>) {
        tracing::debug!(
            count = tools.len(),
            "Recording tool bindings on local backend (no effect on generation)"
        );
        self.bound_tools = tools;
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[derive(Debug, serde::Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, serde::Serialize)]
struct GenerateOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
