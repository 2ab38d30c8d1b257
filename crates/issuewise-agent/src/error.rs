//! Error types for the agent library.

use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in the agent library.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Error from the LLM backend or another remote service.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Error during tool execution.
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Invalid request (e.g. content the backend cannot represent).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP/network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "Backend error: connection refused");

        let err = AgentError::Config("ASTRA_DB_API_ENDPOINT not set".to_string());
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AgentError = parse_err.into();
        assert!(matches!(err, AgentError::Serialization(_)));
    }
}
