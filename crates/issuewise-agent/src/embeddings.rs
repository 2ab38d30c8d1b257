//! Embeddings client for the OpenAI-compatible `/embeddings` endpoint.
//!
//! Used by the vector store gateway to turn issue documents and search
//! queries into vectors.

use reqwest::{Client, header};
use serde::Deserialize;
use std::time::Duration;

use crate::backend::with_retry;
use crate::error::{AgentError, Result};

/// Default embeddings API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default embedding model.
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Configuration for the embeddings client.
#[derive(Debug, Clone)]
pub struct EmbeddingsConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Embedding model name.
    pub model: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,
}

impl EmbeddingsConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Set the embedding model.
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

/// Client for computing text embeddings.
pub struct EmbeddingsClient {
    client: Client,
    config: EmbeddingsConfig,
}

impl EmbeddingsClient {
    /// Create a new embeddings client.
    pub fn new(config: EmbeddingsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.base_url)
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| AgentError::Backend("Embeddings response was empty".to_string()))
    }

    /// Embed a batch of texts, returning vectors in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });

        tracing::debug!(model = %self.config.model, count = texts.len(), "Embedding texts");

        let parsed = with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            "embeddings",
            || async {
                let response = self
                    .client
                    .post(self.embeddings_url())
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", self.config.api_key),
                    )
                    .json(&body)
                    .send()
                    .await?;

                let status = response.status();
                let text = response.text().await?;

                if !status.is_success() {
                    return Err(match status.as_u16() {
                        401 => AgentError::Config(format!("Authentication failed: {}", text)),
                        _ => AgentError::Backend(format!("HTTP {}: {}", status, text)),
                    });
                }

                let parsed: EmbeddingsResponse = serde_json::from_str(&text)
                    .map_err(|e| AgentError::Serialization(e.to_string()))?;
                Ok(parsed)
            },
        )
        .await?;

        if parsed.data.len() != texts.len() {
            return Err(AgentError::Backend(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API documents index-tagged results; sort to guarantee order.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
