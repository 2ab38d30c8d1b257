//! Note-taking tool.
//!
//! Appends model-authored notes to a local text file, one note per line.

use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{AgentError, Result};
use crate::tools::{Tool, required_str};
use crate::types::ToolDefinition;

/// Tool name as presented to the model.
pub const NOTE_TOOL_NAME: &str = "save_note";

/// Tool that appends notes to a file.
pub struct NoteTool {
    path: PathBuf,
}

impl NoteTool {
    /// Create a note tool writing to the given path.
    ///
    /// The file is created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, note: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AgentError::ToolExecution(format!(
                    "Failed to open notes file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", note)
            .map_err(|e| AgentError::ToolExecution(format!("Failed to write note: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Tool for NoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            NOTE_TOOL_NAME,
            "Save a note to a local file for later reference.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "note": {
                        "type": "string",
                        "description": "The note text to save"
                    }
                },
                "required": ["note"]
            }),
        )
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String> {
        let note = required_str(&input, "note")?;
        self.append(&note)?;

        tracing::info!(path = %self.path.display(), "Saved note");
        Ok("Note saved successfully.".to_string())
    }
}
