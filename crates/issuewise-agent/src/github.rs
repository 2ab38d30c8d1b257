//! GitHub issue fetcher.
//!
//! Pulls the issue list for a repository over the REST API. Fetch failures
//! degrade to an empty list with a warning so a missing token or a bad
//! repository name never takes the assistant down.

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::vstore::Document;

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Per-request timeout for the issues endpoint.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// A GitHub issue as returned by the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number within the repository.
    pub number: u64,

    /// Issue title.
    pub title: String,

    /// Issue body, absent when the issue was opened without one.
    pub body: Option<String>,

    /// Web URL of the issue.
    pub html_url: String,

    /// Open/closed state.
    #[serde(default)]
    pub state: String,
}

impl Issue {
    /// Render the issue as a document for indexing.
    ///
    /// The title and body form the searchable text; the URL, number, and
    /// state travel as metadata.
    pub fn to_document(&self) -> Document {
        let text = match self.body.as_deref() {
            Some(body) if !body.is_empty() => format!("{}\n\n{}", self.title, body),
            _ => self.title.clone(),
        };

        Document::new(text).with_metadata(serde_json::json!({
            "url": self.html_url,
            "number": self.number,
            "state": self.state,
        }))
    }
}

/// Configuration for the issue fetcher.
#[derive(Debug, Clone)]
pub struct IssueFetcherConfig {
    /// Repository owner (user or organization).
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// GitHub API token. Unauthenticated requests work but are rate-limited.
    pub token: Option<String>,

    /// API base URL.
    pub base_url: String,
}

impl IssueFetcherConfig {
    /// Create a new config for the given repository.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: None,
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Set the API token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set a custom API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Fetches issues from a GitHub repository.
pub struct IssueFetcher {
    client: Client,
    config: IssueFetcherConfig,
}

impl IssueFetcher {
    /// Create a new fetcher.
    pub fn new(config: IssueFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| AgentError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.config.base_url, self.config.owner, self.config.repo
        )
    }

    /// Fetch the repository's issues.
    ///
    /// Returns the endpoint's first page as-is, in API order. Non-2xx
    /// responses and network failures return an empty list after logging
    /// a warning.
    pub async fn fetch_issues(&self) -> Vec<Issue> {
        let mut request = self
            .client
            .get(self.issues_url())
            .header(header::USER_AGENT, "issuewise")
            .header(header::ACCEPT, "application/vnd.github+json");

        if let Some(ref token) = self.config.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    owner = %self.config.owner,
                    repo = %self.config.repo,
                    error = %e,
                    "Issue fetch failed, returning no issues"
                );
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                owner = %self.config.owner,
                repo = %self.config.repo,
                status = %response.status(),
                "Issue fetch returned non-success status, returning no issues"
            );
            return Vec::new();
        }

        let issues: Vec<Issue> = match response.json().await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse issues response, returning no issues");
                return Vec::new();
            }
        };

        tracing::info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            issues = issues.len(),
            "Fetched issues"
        );

        issues
    }
}
