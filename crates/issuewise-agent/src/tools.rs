//! Tool trait and registry.
//!
//! Tools are the agent's only way to touch the outside world. Each tool
//! declares a definition (name, description, input schema) that is handed
//! to tool-capable backends, and an async execute method.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{AgentError, Result};
use crate::types::ToolDefinition;

/// A tool the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's definition as presented to the model.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given input and return its output text.
    async fn execute(&self, input: serde_json::Value) -> Result<String>;
}

/// Registry of available tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.definition().name;
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Definitions for all registered tools.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute the named tool, erroring if it is not registered.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolExecution(format!("Unknown tool: {}", name)))?;
        tool.execute(input).await
    }
}

/// Extract a required string field from tool input.
pub fn required_str(input: &serde_json::Value, field: &str) -> Result<String> {
    input
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AgentError::ToolExecution(format!("Missing required string field: {}", field))
        })
}
