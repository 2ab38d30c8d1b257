//! Agent engine: the question-answering loop.
//!
//! Each question starts a fresh conversation. The engine sends the
//! conversation to the backend, executes any requested tools, feeds the
//! results back, and repeats until the model produces a final text answer
//! or the turn cap is hit.

use crate::backend::SharedBackend;
use crate::error::{AgentError, Result};
use crate::prompts::AGENT_SYSTEM;
use crate::tools::ToolRegistry;
use crate::types::{CompletionRequest, Message, StopReason, ToolResultBlock, ToolUseBlock};

/// Configuration for the agent engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model identifier passed to the backend.
    pub model: String,

    /// Max tokens per completion.
    pub max_tokens: u32,

    /// Maximum completion turns per question.
    pub max_turns: u32,

    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            max_turns: 8,
            temperature: None,
        }
    }
}

/// The agent engine.
pub struct AgentEngine {
    backend: SharedBackend,
    registry: ToolRegistry,
    config: EngineConfig,
}

impl AgentEngine {
    /// Create a new engine over a backend and tool registry.
    ///
    /// Tools should already be bound on the backend (via
    /// [`crate::backend::LlmBackend::bind_tools`]) before it is shared.
    pub fn new(backend: SharedBackend, registry: ToolRegistry, config: EngineConfig) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    /// Answer a free-text question.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut messages = vec![Message::user(question)];

        // Backends without native tool support never see tool definitions.
        let tools = if self.backend.supports_native_tools() {
            self.registry.definitions()
        } else {
            Vec::new()
        };

        for turn in 0..self.config.max_turns {
            let mut request = CompletionRequest::new(
                &self.config.model,
                messages.clone(),
                self.config.max_tokens,
            )
            .with_system(AGENT_SYSTEM);

            if !tools.is_empty() {
                request = request.with_tools(tools.clone());
            }
            if let Some(t) = self.config.temperature {
                request = request.with_temperature(t);
            }

            let response = self.backend.complete(request).await?;

            tracing::debug!(
                turn = turn + 1,
                stop_reason = ?response.stop_reason,
                tool_uses = response.tool_uses().len(),
                "Completed turn"
            );

            match response.stop_reason {
                Some(StopReason::ToolUse) if response.has_tool_use() => {
                    let tool_uses = response.tool_uses();
                    messages.push(Message::assistant_blocks(response.content));

                    let results = self.execute_tools(&tool_uses).await;
                    messages.push(Message::tool_results(results));
                }
                Some(StopReason::MaxTokens) => {
                    tracing::warn!("Response truncated at max_tokens");
                    return Ok(response.text());
                }
                _ => return Ok(response.text()),
            }
        }

        Err(AgentError::Backend(format!(
            "Agent did not produce a final answer within {} turns",
            self.config.max_turns
        )))
    }

    /// Execute the requested tools, converting failures into error result
    /// blocks so the model can recover.
    async fn execute_tools(&self, tool_uses: &[ToolUseBlock]) -> Vec<ToolResultBlock> {
        let mut results = Vec::with_capacity(tool_uses.len());

        for tool_use in tool_uses {
            tracing::info!(tool = %tool_use.name, "Executing tool");

            let result = match self
                .registry
                .execute(&tool_use.name, tool_use.input.clone())
                .await
            {
                Ok(output) => ToolResultBlock::success(&tool_use.id, output),
                Err(e) => {
                    tracing::warn!(tool = %tool_use.name, error = %e, "Tool execution failed");
                    ToolResultBlock::error(&tool_use.id, e.to_string())
                }
            };

            results.push(result);
        }

        results
    }
}
