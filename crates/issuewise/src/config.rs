//! Environment configuration for the issuewise CLI.
//!
//! Credentials come from the environment (a `.env` file is loaded before
//! parsing); everything else is a CLI flag with a default.

use anyhow::{Context, Result};

/// Environment variable names.
pub const ASTRA_ENDPOINT_VAR: &str = "ASTRA_DB_API_ENDPOINT";
pub const ASTRA_TOKEN_VAR: &str = "ASTRA_DB_APPLICATION_TOKEN";
pub const ASTRA_KEYSPACE_VAR: &str = "ASTRA_DB_KEYSPACE";
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// Credentials and endpoints read from the environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Vector database API endpoint.
    pub astra_endpoint: String,

    /// Vector database application token.
    pub astra_token: String,

    /// Keyspace override; the service default is used when unset.
    pub astra_keyspace: Option<String>,

    /// GitHub API token.
    pub github_token: String,

    /// OpenAI API key; required for the hosted provider and embeddings.
    pub openai_api_key: Option<String>,
}

impl EnvConfig {
    /// Read configuration from the environment.
    ///
    /// The vector database endpoint and token are required; everything else
    /// is optional here and validated where it is used.
    pub fn from_env() -> Result<Self> {
        let astra_endpoint = std::env::var(ASTRA_ENDPOINT_VAR)
            .with_context(|| format!("{} environment variable not set", ASTRA_ENDPOINT_VAR))?;
        let astra_token = std::env::var(ASTRA_TOKEN_VAR)
            .with_context(|| format!("{} environment variable not set", ASTRA_TOKEN_VAR))?;
        let github_token = std::env::var(GITHUB_TOKEN_VAR)
            .with_context(|| format!("{} environment variable not set", GITHUB_TOKEN_VAR))?;

        Ok(Self {
            astra_endpoint,
            astra_token,
            astra_keyspace: std::env::var(ASTRA_KEYSPACE_VAR).ok(),
            github_token,
            openai_api_key: std::env::var(OPENAI_KEY_VAR).ok(),
        })
    }

    /// Get the OpenAI API key, erroring if it is missing.
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .with_context(|| format!("{} environment variable not set", OPENAI_KEY_VAR))
    }
}
