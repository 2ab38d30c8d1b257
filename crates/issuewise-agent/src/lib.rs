//! issuewise-agent: agent engine and service gateways
//!
//! This crate provides the core of the issuewise assistant:
//! - LLM backend abstraction (hosted chat API, local text generation)
//! - Tool-calling agent engine
//! - GitHub issue fetching
//! - Vector store gateway with client-side embeddings
//! - The issue-search and note-taking tools

pub mod backend;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod github;
pub mod local;
pub mod note;
pub mod openai;
pub mod prompts;
pub mod retriever;
pub mod tools;
pub mod types;
pub mod vstore;

pub use backend::{LlmBackend, MockBackend, SharedBackend, with_retry};
pub use embeddings::{EmbeddingsClient, EmbeddingsConfig};
pub use engine::{AgentEngine, EngineConfig};
pub use error::{AgentError, Result};
pub use github::{Issue, IssueFetcher, IssueFetcherConfig};
pub use local::{LocalBackend, LocalConfig};
pub use note::{NOTE_TOOL_NAME, NoteTool};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use prompts::AGENT_SYSTEM;
pub use retriever::{IssueSearchTool, SEARCH_TOOL_NAME};
pub use tools::{Tool, ToolRegistry, required_str};
pub use types::{
    CompletionRequest, CompletionResponse, Content, ContentBlock, Message, Role, StopReason,
    ToolDefinition, ToolResultBlock, ToolUseBlock, Usage,
};
pub use vstore::{BestEffort, Document, VectorStore, VectorStoreConfig};
