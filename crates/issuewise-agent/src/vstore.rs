//! Vector store gateway for an Astra-style JSON Data API.
//!
//! Documents are embedded client-side and stored with a `$vector` field;
//! similarity search sorts by query vector. Collection deletion is
//! optimistic and returns a [`BestEffort`] outcome the caller must consume.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::embeddings::EmbeddingsClient;
use crate::error::{AgentError, Result};

/// Default keyspace when none is configured.
const DEFAULT_KEYSPACE: &str = "default_keyspace";

/// A document stored in (or retrieved from) the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content of the document.
    pub text: String,

    /// Arbitrary metadata attached to the document.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Document {
    /// Create a new document with empty metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach metadata to the document.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Outcome of an optimistic operation that may have failed remotely.
///
/// Failure is not an error for the calling flow, but it must not be
/// silently discarded either. Call [`BestEffort::log`] (or inspect
/// [`BestEffort::succeeded`]) to consume it.
#[must_use = "best-effort outcome should be logged or inspected"]
#[derive(Debug)]
pub struct BestEffort {
    operation: String,
    outcome: std::result::Result<(), AgentError>,
}

impl BestEffort {
    /// A successful outcome.
    pub fn ok(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            outcome: Ok(()),
        }
    }

    /// A failed outcome carrying the underlying error.
    pub fn failed(operation: impl Into<String>, error: AgentError) -> Self {
        Self {
            operation: operation.into(),
            outcome: Err(error),
        }
    }

    /// Whether the operation succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Consume the outcome, logging a warning on failure.
    pub fn log(self) {
        match self.outcome {
            Ok(()) => tracing::debug!(operation = %self.operation, "Best-effort operation succeeded"),
            Err(e) => tracing::warn!(
                operation = %self.operation,
                error = %e,
                "Best-effort operation failed, continuing"
            ),
        }
    }
}

/// Configuration for the vector store gateway.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Database API endpoint, e.g. `https://<id>-<region>.apps.astra.datastax.com`.
    pub endpoint: String,

    /// Application token for authentication.
    pub token: String,

    /// Keyspace holding the collection.
    pub keyspace: String,

    /// Collection name.
    pub collection: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl VectorStoreConfig {
    /// Create a new config for the given endpoint and token.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            keyspace: DEFAULT_KEYSPACE.to_string(),
            collection: collection.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the keyspace.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }
}

/// Gateway to a hosted vector collection.
pub struct VectorStore {
    client: Client,
    config: VectorStoreConfig,
    embeddings: EmbeddingsClient,
}

impl VectorStore {
    /// Create a new gateway. Does not touch the remote service.
    pub fn new(config: VectorStoreConfig, embeddings: EmbeddingsClient) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            embeddings,
        })
    }

    /// URL for keyspace-level commands (create/delete collection).
    fn keyspace_url(&self) -> String {
        format!(
            "{}/api/json/v1/{}",
            self.config.endpoint, self.config.keyspace
        )
    }

    /// URL for collection-level commands (insert/find).
    fn collection_url(&self) -> String {
        format!("{}/{}", self.keyspace_url(), self.config.collection)
    }

    /// Send a Data API command and return the parsed response body.
    async fn command(&self, url: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .header("Token", &self.config.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => AgentError::Config(format!("Vector store authentication failed: {}", text)),
                _ => AgentError::Backend(format!(
                    "Vector store request failed with HTTP {}: {}",
                    status, text
                )),
            });
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| AgentError::Serialization(e.to_string()))?;

        // The Data API reports command failures in-band with HTTP 200.
        if let Some(errors) = parsed.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let message = errors[0]
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                let code = errors[0]
                    .get("errorCode")
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                return Err(AgentError::Backend(format!(
                    "Vector store command failed [{}]: {}",
                    code, message
                )));
            }
        }

        Ok(parsed)
    }

    /// Ensure the collection exists with a vector index.
    ///
    /// Creating an already-existing collection with the same options is a
    /// no-op on the Data API, so this is safe to call on every startup.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        tracing::info!(
            collection = %self.config.collection,
            keyspace = %self.config.keyspace,
            "Ensuring vector collection exists"
        );

        self.command(
            &self.keyspace_url(),
            serde_json::json!({
                "createCollection": {
                    "name": self.config.collection,
                    "options": {
                        "vector": { "dimension": dimension, "metric": "cosine" }
                    }
                }
            }),
        )
        .await?;

        Ok(())
    }

    /// Embed and insert documents into the collection.
    ///
    /// Returns the number of documents inserted. An empty input is a no-op.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let records: Vec<serde_json::Value> = documents
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| {
                serde_json::json!({
                    "text": doc.text,
                    "metadata": doc.metadata,
                    "$vector": vector,
                })
            })
            .collect();

        let response = self
            .command(
                &self.collection_url(),
                serde_json::json!({
                    "insertMany": { "documents": records }
                }),
            )
            .await?;

        let inserted = response
            .get("status")
            .and_then(|s| s.get("insertedIds"))
            .and_then(|ids| ids.as_array())
            .map(|ids| ids.len())
            .unwrap_or(documents.len());

        tracing::info!(count = inserted, collection = %self.config.collection, "Inserted documents");
        Ok(inserted)
    }

    /// Find the `k` documents most similar to the query text.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let vector = self.embeddings.embed(query).await?;

        let response = self
            .command(
                &self.collection_url(),
                serde_json::json!({
                    "find": {
                        "sort": { "$vector": vector },
                        "options": { "limit": k }
                    }
                }),
            )
            .await?;

        let documents: Vec<Document> = response
            .get("data")
            .and_then(|d| d.get("documents"))
            .and_then(|d| d.as_array())
            .map(|docs| {
                docs.iter()
                    .map(|doc| Document {
                        text: doc
                            .get("text")
                            .and_then(|t| t.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        metadata: doc.get("metadata").cloned().unwrap_or(serde_json::Value::Null),
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(query_len = query.len(), hits = documents.len(), "Similarity search");
        Ok(documents)
    }

    /// Optimistically drop the collection.
    ///
    /// A missing collection or a transient failure does not block the
    /// reindex flow, so the outcome is returned as [`BestEffort`] instead
    /// of an error.
    pub async fn delete_collection(&self) -> BestEffort {
        let operation = format!("deleteCollection {}", self.config.collection);

        let result = self
            .command(
                &self.keyspace_url(),
                serde_json::json!({
                    "deleteCollection": { "name": self.config.collection }
                }),
            )
            .await;

        match result {
            Ok(_) => BestEffort::ok(operation),
            Err(e) => BestEffort::failed(operation, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingsConfig;

    fn store(endpoint: &str) -> VectorStore {
        let embeddings = EmbeddingsClient::new(EmbeddingsConfig::new("key")).unwrap();
        VectorStore::new(
            VectorStoreConfig::new(endpoint, "token", "github"),
            embeddings,
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let store = store("https://db.example.com");
        assert_eq!(
            store.keyspace_url(),
            "https://db.example.com/api/json/v1/default_keyspace"
        );
        assert_eq!(
            store.collection_url(),
            "https://db.example.com/api/json/v1/default_keyspace/github"
        );
    }

    #[test]
    fn test_custom_keyspace() {
        let embeddings = EmbeddingsClient::new(EmbeddingsConfig::new("key")).unwrap();
        let store = VectorStore::new(
            VectorStoreConfig::new("https://db.example.com", "token", "github")
                .with_keyspace("issues"),
            embeddings,
        )
        .unwrap();
        assert_eq!(
            store.collection_url(),
            "https://db.example.com/api/json/v1/issues/github"
        );
    }

    #[test]
    fn test_best_effort_outcomes() {
        let ok = BestEffort::ok("deleteCollection github");
        assert!(ok.succeeded());
        ok.log();

        let failed = BestEffort::failed(
            "deleteCollection github",
            AgentError::Backend("collection does not exist".to_string()),
        );
        assert!(!failed.succeeded());
        failed.log();
    }

    #[test]
    fn test_document_builder() {
        let doc = Document::new("Issue: crash on login")
            .with_metadata(serde_json::json!({"url": "https://github.com/o/r/issues/1"}));
        assert_eq!(doc.text, "Issue: crash on login");
        assert_eq!(doc.metadata["url"], "https://github.com/o/r/issues/1");
    }

    #[tokio::test]
    async fn test_add_documents_empty_is_noop() {
        let store = store("https://db.invalid");
        let inserted = store.add_documents(&[]).await.unwrap();
        assert_eq!(inserted, 0);
    }
}
