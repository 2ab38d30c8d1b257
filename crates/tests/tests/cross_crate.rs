//! Cross-crate integration tests.
//!
//! Exercise the HTTP gateways against a mock server and the full agent
//! loop against a scripted backend.

use std::sync::Arc;

use issuewise_agent::{
    AgentEngine, CompletionRequest, CompletionResponse, ContentBlock, EmbeddingsClient,
    EmbeddingsConfig, EngineConfig, IssueFetcher, IssueFetcherConfig, IssueSearchTool, LlmBackend,
    LocalBackend, LocalConfig, Message, MockBackend, NoteTool, StopReason, ToolRegistry, Usage,
    VectorStore, VectorStoreConfig,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn issue_json(number: u64, title: &str, body: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "number": number,
        "title": title,
        "body": body,
        "html_url": format!("https://github.com/o/r/issues/{}", number),
        "state": "open",
    })
}

fn embeddings_response(count: usize) -> serde_json::Value {
    let data: Vec<_> = (0..count)
        .map(|i| serde_json::json!({"index": i, "embedding": [0.1, 0.2, 0.3]}))
        .collect();
    serde_json::json!({"data": data})
}

async fn mock_store(server: &MockServer) -> VectorStore {
    let embeddings = EmbeddingsClient::new(
        EmbeddingsConfig::new("test-key").with_base_url(format!("{}/v1", server.uri())),
    )
    .unwrap();
    VectorStore::new(
        VectorStoreConfig::new(server.uri(), "test-token", "github"),
        embeddings,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Issue fetcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetcher_passes_response_body_through_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues"))
        .and(header("authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            issue_json(1, "Crash on login", Some("Stack trace attached")),
            issue_json(9, "Fix typo", Some("")),
            issue_json(2, "Add dark mode", None),
        ])))
        .mount(&server)
        .await;

    let fetcher = IssueFetcher::new(
        IssueFetcherConfig::new("o", "r")
            .with_token("gh-token")
            .with_base_url(server.uri()),
    )
    .unwrap();

    // Everything the endpoint returned, in API order, no filtering.
    let issues = fetcher.fetch_issues().await;
    assert_eq!(issues.len(), 3);
    assert_eq!(issues[0].number, 1);
    assert_eq!(issues[1].number, 9);
    assert_eq!(issues[2].title, "Add dark mode");
}

#[tokio::test]
async fn fetcher_degrades_to_empty_on_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let fetcher =
        IssueFetcher::new(IssueFetcherConfig::new("o", "r").with_base_url(server.uri())).unwrap();

    assert!(fetcher.fetch_issues().await.is_empty());
}

#[tokio::test]
async fn fetcher_degrades_to_empty_on_connection_failure() {
    // Nothing is listening here.
    let fetcher = IssueFetcher::new(
        IssueFetcherConfig::new("o", "r").with_base_url("http://127.0.0.1:1"),
    )
    .unwrap();

    assert!(fetcher.fetch_issues().await.is_empty());
}

// ---------------------------------------------------------------------------
// Vector store gateway
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_indexes_and_searches_documents() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_response(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_response(1)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace"))
        .and(body_partial_json(
            serde_json::json!({"createCollection": {"name": "github"}}),
        ))
        .and(header("Token", "test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": {"ok": 1}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace/github"))
        .and(body_partial_json(serde_json::json!({"insertMany": {}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"status": {"insertedIds": ["a", "b"]}}),
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace/github"))
        .and(body_partial_json(
            serde_json::json!({"find": {"options": {"limit": 3}}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"documents": [
                {"text": "Crash on login", "metadata": {"url": "u1"}},
                {"text": "Add dark mode", "metadata": {"url": "u2"}},
                {"text": "Flaky test", "metadata": {"url": "u3"}},
            ]}
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server).await;

    store.ensure_collection(3).await.unwrap();

    let documents = vec![
        issuewise_agent::Document::new("Crash on login"),
        issuewise_agent::Document::new("Add dark mode"),
    ];
    assert_eq!(store.add_documents(&documents).await.unwrap(), 2);

    let hits = store.similarity_search("login problems", 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].text, "Crash on login");
}

#[tokio::test]
async fn store_surfaces_in_band_command_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errors": [{"message": "too many collections", "errorCode": "TOO_MANY_COLLECTIONS"}]
        })))
        .mount(&server)
        .await;

    let store = mock_store(&server).await;
    let err = store.ensure_collection(3).await.unwrap_err();
    assert!(err.to_string().contains("TOO_MANY_COLLECTIONS"));
}

#[tokio::test]
async fn delete_collection_failure_is_best_effort() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = mock_store(&server).await;

    let outcome = store.delete_collection().await;
    assert!(!outcome.succeeded());
    outcome.log();
}

// ---------------------------------------------------------------------------
// Local backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_backend_generates_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "hello",
            "prompt_eval_count": 12,
            "eval_count": 2,
        })))
        .mount(&server)
        .await;

    let backend = LocalBackend::new(LocalConfig::default().with_base_url(server.uri())).unwrap();

    let response = backend
        .complete(CompletionRequest::new("llama3.2", vec![Message::user("hi")], 512))
        .await
        .unwrap();

    assert_eq!(response.text(), "hello");
    assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    assert_eq!(response.usage.input_tokens, 12);
}

// ---------------------------------------------------------------------------
// Agent loop end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn agent_answers_via_github_search() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_response(1)))
        .mount(&server)
        .await;

    // Search must request exactly three documents.
    Mock::given(method("POST"))
        .and(path("/api/json/v1/default_keyspace/github"))
        .and(body_partial_json(
            serde_json::json!({"find": {"options": {"limit": 3}}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"documents": [
                {"text": "Crash on login", "metadata": {"url": "u1"}},
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(mock_store(&server).await);

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(IssueSearchTool::new(store)));

    let backend = Arc::new(MockBackend::new(vec![
        CompletionResponse::new(
            "msg_1",
            "mock-model",
            vec![ContentBlock::tool_use(
                "call_1",
                "github_search",
                serde_json::json!({"query": "login"}),
            )],
            StopReason::ToolUse,
            Usage::new(10, 10),
        ),
        CompletionResponse::new(
            "msg_2",
            "mock-model",
            vec![ContentBlock::text("The login crash is tracked at u1.")],
            StopReason::EndTurn,
            Usage::new(10, 10),
        ),
    ]));

    let engine = AgentEngine::new(backend.clone(), tools, EngineConfig::default());
    let answer = engine.ask("what login bugs exist?").await.unwrap();

    assert_eq!(answer, "The login crash is tracked at u1.");

    // The search results must have reached the model.
    let requests = backend.requests();
    let blocks = requests[1].messages[2].content.blocks();
    match &blocks[0] {
        ContentBlock::ToolResult { content, is_error, .. } => {
            assert!(!is_error);
            assert!(content.as_deref().unwrap().contains("Crash on login"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
}

#[tokio::test]
async fn agent_saves_notes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let notes_path = dir.path().join("summary.txt");

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(NoteTool::new(&notes_path)));

    let backend = Arc::new(MockBackend::new(vec![
        CompletionResponse::new(
            "msg_1",
            "mock-model",
            vec![ContentBlock::tool_use(
                "call_1",
                "save_note",
                serde_json::json!({"note": "Two login bugs remain open"}),
            )],
            StopReason::ToolUse,
            Usage::new(10, 10),
        ),
        CompletionResponse::new(
            "msg_2",
            "mock-model",
            vec![ContentBlock::text("Noted.")],
            StopReason::EndTurn,
            Usage::new(10, 10),
        ),
    ]));

    let engine = AgentEngine::new(backend, tools, EngineConfig::default());
    let answer = engine.ask("remember the login situation").await.unwrap();

    assert_eq!(answer, "Noted.");
    let contents = std::fs::read_to_string(&notes_path).unwrap();
    assert_eq!(contents, "Two login bugs remain open\n");
}
