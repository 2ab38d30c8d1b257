//! issuewise: ask questions about a GitHub repository's issues
//!
//! Fetches a repository's issues, indexes them in a hosted vector
//! collection, and answers free-text questions through a tool-calling
//! agent with retrieval and note-taking tools.

mod config;
mod repl;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::EnvConfig;
use issuewise_agent::{
    AgentEngine, EmbeddingsClient, EmbeddingsConfig, EngineConfig, IssueFetcher,
    IssueFetcherConfig, IssueSearchTool, LlmBackend, LocalBackend, LocalConfig, NoteTool,
    OpenAiBackend, OpenAiConfig, ToolRegistry, VectorStore, VectorStoreConfig,
};

/// Vector dimension of the default embedding model.
const EMBEDDING_DIM: usize = 1536;

/// Ask questions about a GitHub repository's issues
#[derive(Parser)]
#[command(name = "issuewise")]
#[command(version, about, long_about = None)]
struct Cli {
    /// LLM provider: openai, local
    #[arg(long, default_value = "openai")]
    provider: String,

    /// Model override (provider-specific default when unset)
    #[arg(long)]
    model: Option<String>,

    /// Repository owner (user or organization)
    #[arg(long, default_value = "sakhileln")]
    owner: String,

    /// Repository name
    #[arg(long, default_value = "Space-Nomad")]
    repo: String,

    /// Vector collection name
    #[arg(long, default_value = "github")]
    collection: String,

    /// File notes are appended to
    #[arg(long, default_value = "summary.txt")]
    notes_path: std::path::PathBuf,

    /// Base URL for the local generation server
    #[arg(long, default_value = "http://localhost:11434")]
    local_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging to stderr, keeping stdout clean for the conversation.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Create a backend for the requested provider, with tools already bound.
fn create_backend(
    cli: &Cli,
    env: &EnvConfig,
    tools: &ToolRegistry,
) -> Result<Arc<dyn LlmBackend>> {
    match cli.provider.as_str() {
        "openai" => {
            let mut openai_config = OpenAiConfig::new(env.require_openai_key()?);
            if let Some(ref model) = cli.model {
                openai_config = openai_config.with_model(model);
            }
            let mut backend = OpenAiBackend::new(openai_config)?;
            backend.bind_tools(tools.definitions());
            Ok(Arc::new(backend))
        }
        "local" => {
            let mut local_config = LocalConfig::default().with_base_url(&cli.local_url);
            if let Some(ref model) = cli.model {
                local_config = local_config.with_model(model);
            }
            let mut backend = LocalBackend::new(local_config)?;
            // Recorded only; the engine sends no tool definitions here.
            backend.bind_tools(tools.definitions());
            Ok(Arc::new(backend))
        }
        other => anyhow::bail!("Unknown provider: {}", other),
    }
}

/// Ask whether to refetch and reindex the issues. Defaults to no.
fn prompt_reindex() -> Result<bool> {
    print!("Do you want to update the issues? (y/N): ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    Ok(is_affirmative(&line))
}

/// `y` and `yes` in any casing opt in; everything else is "no".
fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Refetch the issues and rebuild the collection from scratch.
async fn reindex(fetcher: &IssueFetcher, store: &VectorStore) -> Result<()> {
    store.delete_collection().await.log();
    store.ensure_collection(EMBEDDING_DIM).await?;

    let issues = fetcher.fetch_issues().await;
    if issues.is_empty() {
        warn!("No issues fetched; the index will be empty");
        return Ok(());
    }

    let documents: Vec<_> = issues.iter().map(|i| i.to_document()).collect();
    let inserted = store.add_documents(&documents).await?;
    info!(count = inserted, "Reindexed issues");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let env = EnvConfig::from_env()?;

    // Embeddings are needed for both indexing and search, on every provider.
    let embeddings =
        EmbeddingsClient::new(EmbeddingsConfig::new(env.require_openai_key()?))?;

    let mut store_config =
        VectorStoreConfig::new(&env.astra_endpoint, &env.astra_token, &cli.collection);
    if let Some(ref keyspace) = env.astra_keyspace {
        store_config = store_config.with_keyspace(keyspace);
    }
    let store = Arc::new(VectorStore::new(store_config, embeddings)?);

    let fetcher = IssueFetcher::new(
        IssueFetcherConfig::new(&cli.owner, &cli.repo).with_token(&env.github_token),
    )?;

    if prompt_reindex()? {
        reindex(&fetcher, &store).await?;
    } else {
        store.ensure_collection(EMBEDDING_DIM).await?;
    }

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(IssueSearchTool::new(store.clone())));
    tools.register(Box::new(NoteTool::new(&cli.notes_path)));

    let backend = create_backend(&cli, &env, &tools)?;
    info!(provider = %backend.name(), "Backend ready");

    let mut engine_config = EngineConfig::default();
    if let Some(ref model) = cli.model {
        engine_config.model = model.clone();
    }

    let engine = AgentEngine::new(backend, tools, engine_config);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    repl::run(&engine, &mut stdin.lock(), &mut stdout.lock()).await
}
