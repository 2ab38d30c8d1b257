//! OpenAI-compatible chat backend implementation.
//!
//! This is the hosted-model variant: tool calling is native, so tool
//! definitions are passed through the API and tool-use requests come back
//! as structured `tool_calls`.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;

use crate::backend::{LlmBackend, with_retry};
use crate::error::{AgentError, Result};
use crate::types::{
    CompletionRequest, CompletionResponse, ContentBlock, Role, StopReason, ToolDefinition, Usage,
};

/// Default OpenAI API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default model for the hosted backend.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model to use for completions (overrides request model).
    pub model: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Create config from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            AgentError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

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

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// OpenAI-compatible API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
    bound_tools: Vec<ToolDefinition>,
}

impl OpenAiBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
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

    /// Create a backend from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Add authentication headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Convert our CompletionRequest to the OpenAI chat format.
    fn to_chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = Vec::new();

        // Add system message if present
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        // Add conversation messages with proper tool handling
        for m in &request.messages {
            let blocks = m.content.blocks();

            // Assistant tool-use blocks become tool_calls
            let tool_calls: Vec<_> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some(ChatToolCall {
                        id: id.clone(),
                        call_type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: name.clone(),
                            arguments: serde_json::to_string(input).unwrap_or_default(),
                        },
                    }),
                    _ => None,
                })
                .collect();

            // Tool results become separate "tool" role messages
            let tool_results: Vec<_> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => Some((tool_use_id.clone(), content.clone().unwrap_or_default())),
                    _ => None,
                })
                .collect();

            let text_content: String = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("");

            if !tool_results.is_empty() {
                for (tool_id, result_text) in tool_results {
                    messages.push(ChatMessage {
                        role: "tool".to_string(),
                        content: Some(result_text),
                        tool_calls: None,
                        tool_call_id: Some(tool_id),
                    });
                }
            } else if !tool_calls.is_empty() {
                messages.push(ChatMessage {
                    role: "assistant".to_string(),
                    content: if text_content.is_empty() {
                        None
                    } else {
                        Some(text_content)
                    },
                    tool_calls: Some(tool_calls),
                    tool_call_id: None,
                });
            } else {
                messages.push(ChatMessage {
                    role: match m.role {
                        Role::User => "user".to_string(),
                        Role::Assistant => "assistant".to_string(),
                    },
                    content: Some(text_content),
                    tool_calls: None,
                    tool_call_id: None,
                });
            }
        }

        // Per-request tools win; otherwise fall back to the bound set.
        let available = if request.tools.is_empty() {
            &self.bound_tools
        } else {
            &request.tools
        };
        let tools: Option<Vec<ChatTool>> = if available.is_empty() {
            None
        } else {
            Some(
                available
                    .iter()
                    .map(|t| ChatTool {
                        tool_type: "function".to_string(),
                        function: ChatFunction {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            tools,
        }
    }

    /// Handle a successful response.
    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Serialization(e.to_string()))?;

        Ok(parsed.into())
    }

    /// Handle an error response.
    async fn handle_error_response(response: Response) -> AgentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<ChatErrorResponse>(&body) {
            match status.as_u16() {
                401 => AgentError::Config(format!(
                    "Authentication failed: {}",
                    error.error.message
                )),
                429 => AgentError::Backend(format!(
                    "Rate limit exceeded: {}",
                    error.error.message
                )),
                500..=599 => AgentError::Backend(format!("Server error: {}", error.error.message)),
                _ => AgentError::Backend(error.error.message),
            }
        } else {
            AgentError::Backend(format!("HTTP {}: {}", status, body))
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let chat_request = self.to_chat_request(&request);

        tracing::debug!(
            model = %chat_request.model,
            messages = chat_request.messages.len(),
            tools = chat_request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "Sending chat completion request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "openai",
            || async {
                let response = self
                    .add_headers(self.client.post(self.completions_url()))
                    .json(&chat_request)
                    .send()
                    .await?;

                Self::handle_response(response).await
            },
        )
        .await
    }

    fn bind_tools(&mut self, tools: Vec<ToolDefinition>) {
        self.bound_tools = tools;
    }

    fn name(&self) -> &str {
        "openai"
    }

    /// Tool calling is native on the chat completions API.
    fn supports_native_tools(&self) -> bool {
        true
    }
}

// ============================================================================
// Request/Response types for the OpenAI chat completions API
// ============================================================================

#[derive(Debug, serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Debug, serde::Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatFunction,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: ChatFunctionCall,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChatResponse {
    id: String,
    choices: Vec<ChatChoice>,
    model: String,
    usage: ChatUsage,
}

impl From<ChatResponse> for CompletionResponse {
    fn from(resp: ChatResponse) -> Self {
        let choice = resp.choices.into_iter().next();

        let (content, stop_reason) = if let Some(c) = choice {
            let mut blocks = Vec::new();

            if let Some(text) = c.message.content {
                if !text.is_empty() {
                    blocks.push(ContentBlock::Text { text });
                }
            }

            if let Some(tool_calls) = c.message.tool_calls {
                for tc in tool_calls {
                    let input: serde_json::Value =
                        serde_json::from_str(&tc.function.arguments).unwrap_or_default();
                    blocks.push(ContentBlock::ToolUse {
                        id: tc.id,
                        name: tc.function.name,
                        input,
                    });
                }
            }

            let stop = match c.finish_reason.as_deref() {
                Some("stop") => Some(StopReason::EndTurn),
                Some("tool_calls") => Some(StopReason::ToolUse),
                Some("length") => Some(StopReason::MaxTokens),
                _ => Some(StopReason::EndTurn),
            };

            (blocks, stop)
        } else {
            (vec![], Some(StopReason::EndTurn))
        };

        CompletionResponse {
            id: resp.id,
            role: Role::Assistant,
            content,
            model: resp.model,
            stop_reason,
            usage: Usage {
                input_tokens: resp.usage.prompt_tokens,
                output_tokens: resp.usage.completion_tokens,
            },
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, serde::Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, serde::Deserialize)]
struct ChatError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn test_config_new() {
        let config = OpenAiConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_config_builder() {
        let config = OpenAiConfig::new("key")
            .with_model("gpt-4o")
            .with_base_url("http://localhost:8080/v1")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_completions_url() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("key")).unwrap();
        assert_eq!(
            backend.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_backend_name_and_native_tools() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("key")).unwrap();
        assert_eq!(backend.name(), "openai");
        assert!(backend.supports_native_tools());
    }

    #[test]
    fn test_to_chat_request() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("key")).unwrap();

        let request = CompletionRequest::new("ignored", vec![Message::user("Hello")], 100)
            .with_system("Be helpful.");

        let chat_req = backend.to_chat_request(&request);
        assert_eq!(chat_req.model, DEFAULT_MODEL);
        assert_eq!(chat_req.messages.len(), 2);
        assert_eq!(chat_req.messages[0].role, "system");
        assert_eq!(chat_req.messages[1].role, "user");
        assert_eq!(chat_req.max_tokens, Some(100));
    }

    #[test]
    fn test_bound_tools_used_when_request_has_none() {
        let mut backend = OpenAiBackend::new(OpenAiConfig::new("key")).unwrap();
        backend.bind_tools(vec![ToolDefinition::new(
            "github_search",
            "Search issues",
            serde_json::json!({"type": "object"}),
        )]);

        let request = CompletionRequest::new("ignored", vec![Message::user("hi")], 100);
        let chat_req = backend.to_chat_request(&request);

        let tools = chat_req.tools.expect("bound tools should be sent");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "github_search");
    }

    #[test]
    fn test_tool_results_become_tool_messages() {
        let backend = OpenAiBackend::new(OpenAiConfig::new("key")).unwrap();

        let request = CompletionRequest::new(
            "ignored",
            vec![
                Message::user("find bugs"),
                Message::assistant_blocks(vec![ContentBlock::tool_use(
                    "call_1",
                    "github_search",
                    serde_json::json!({"query": "bugs"}),
                )]),
                Message::tool_results(vec![crate::types::ToolResultBlock::success(
                    "call_1",
                    "1. Crash on login",
                )]),
            ],
            100,
        );

        let chat_req = backend.to_chat_request(&request);
        assert_eq!(chat_req.messages.len(), 3);
        assert_eq!(chat_req.messages[1].role, "assistant");
        assert!(chat_req.messages[1].tool_calls.is_some());
        assert_eq!(chat_req.messages[2].role, "tool");
        assert_eq!(chat_req.messages[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_chat_response_conversion() {
        let resp = ChatResponse {
            id: "chatcmpl-123".to_string(),
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: Some("Hello!".to_string()),
                    tool_calls: None,
                },
                finish_reason: Some("stop".to_string()),
            }],
            model: "gpt-4o-mini".to_string(),
            usage: ChatUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        };

        let response: CompletionResponse = resp.into();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.text(), "Hello!");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_chat_response_with_tool_calls() {
        let resp = ChatResponse {
            id: "chatcmpl-456".to_string(),
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: None,
                    tool_calls: Some(vec![ChatToolCall {
                        id: "call_123".to_string(),
                        call_type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: "github_search".to_string(),
                            arguments: r#"{"query": "login crash"}"#.to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".to_string()),
            }],
            model: "gpt-4o-mini".to_string(),
            usage: ChatUsage {
                prompt_tokens: 50,
                completion_tokens: 30,
            },
        };

        let response: CompletionResponse = resp.into();
        assert!(response.has_tool_use());
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));

        let tool_uses = response.tool_uses();
        assert_eq!(tool_uses.len(), 1);
        assert_eq!(tool_uses[0].name, "github_search");
        assert_eq!(tool_uses[0].input["query"], "login crash");
    }
}
