//! Issue retrieval tool backed by the vector store.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::tools::{Tool, required_str};
use crate::types::ToolDefinition;
use crate::vstore::VectorStore;

/// Tool name as presented to the model.
pub const SEARCH_TOOL_NAME: &str = "github_search";

/// Number of documents returned per search.
const SEARCH_K: usize = 3;

/// Tool that searches the indexed issues by similarity.
pub struct IssueSearchTool {
    store: Arc<VectorStore>,
}

impl IssueSearchTool {
    /// Create a search tool over the given store.
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for IssueSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search for information about github issues. \
             For any questions about github issues, you must use this tool!",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn execute(&self, input: serde_json::Value) -> Result<String> {
        let query = required_str(&input, "query")?;

        let documents = self.store.similarity_search(&query, SEARCH_K).await?;

        if documents.is_empty() {
            return Ok("No matching issues found.".to_string());
        }

        // Number the hits so the model can cite them.
        let rendered: Vec<String> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let url = doc
                    .metadata
                    .get("url")
                    .and_then(|u| u.as_str())
                    .unwrap_or("");
                if url.is_empty() {
                    format!("{}. {}", i + 1, doc.text)
                } else {
                    format!("{}. {} ({})", i + 1, doc.text, url)
                }
            })
            .collect();

        Ok(rendered.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingsClient, EmbeddingsConfig};
    use crate::vstore::VectorStoreConfig;

    #[test]
    fn test_definition_shape() {
        let embeddings = EmbeddingsClient::new(EmbeddingsConfig::new("key")).unwrap();
        let store = Arc::new(
            VectorStore::new(
                VectorStoreConfig::new("https://db.invalid", "token", "github"),
                embeddings,
            )
            .unwrap(),
        );
        let tool = IssueSearchTool::new(store);

        let def = tool.definition();
        assert_eq!(def.name, SEARCH_TOOL_NAME);
        assert!(def.description.contains("github issues"));
        assert_eq!(def.input_schema["required"][0], "query");
    }
}
