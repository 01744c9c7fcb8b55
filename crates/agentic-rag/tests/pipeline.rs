use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;
use std::sync::Arc;

use agentic_rag::config::RagConfig;
use agentic_rag::generation::LlmResponseAgent;
use agentic_rag::ingestion::IngestionAgent;
use agentic_rag::providers::gemini::gemini_providers;
use agentic_rag::retrieval::{RetrievalAgent, INDEX_FILE};
use agentic_rag::{CoordinatorAgent, Error};

fn config(server: &MockServer, dir: &std::path::Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.gemini.api_key = Some("test-key".to_string());
    config.gemini.base_url = server.base_url();
    config.gemini.max_retries = 0;
    config.retrieval.persist_dir = dir.join("vector_index");
    config
}

fn coordinator(config: &RagConfig) -> CoordinatorAgent {
    let (embedder, llm) = gemini_providers(&config.gemini).unwrap();
    CoordinatorAgent::new(
        IngestionAgent::new(&config.chunking),
        Arc::new(RetrievalAgent::new(embedder, &config.retrieval).unwrap()),
        LlmResponseAgent::new(llm),
    )
}

#[tokio::test]
async fn gemini_pipeline_answers_from_document() {
    let server = MockServer::start_async().await;
    let embed_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:embedContent")
                .header("x-goog-api-key", "test-key");
            then.status(200)
                .json_body(json!({"embedding": {"values": [0.6, 0.8, 0.0]}}));
        })
        .await;
    let generate_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-pro:generateContent")
                .body_contains("You are a helpful assistant. Use the context below to answer the question.")
                .body_contains("The warranty lasts two years.");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Two years."}]},
                    "finishReason": "STOP"
                }]
            }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warranty.txt");
    std::fs::write(&path, "The warranty lasts two years.").unwrap();

    let config = config(&server, dir.path());
    let coordinator = coordinator(&config);

    let (answer, sources) = coordinator
        .handle_file_and_query(&path, "How long is the warranty?")
        .await
        .unwrap();

    assert_eq!(answer, "Two years.");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].content, "The warranty lasts two years.");
    assert!(sources[0].score.is_some());
    assert!(config.retrieval.persist_dir.join(INDEX_FILE).exists());

    // one chunk embedding plus one query embedding
    embed_mock.assert_hits_async(2).await;
    generate_mock.assert_async().await;
}

#[tokio::test]
async fn embedding_failures_surface_as_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/embedding-001:embedContent");
            then.status(403).body("PERMISSION_DENIED");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Anything at all.").unwrap();

    let coordinator = coordinator(&config(&server, dir.path()));
    let err = coordinator
        .handle_file_and_query(&path, "What?")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
}

#[tokio::test]
async fn health_check_reports_each_provider() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1beta/models/embedding-001");
            then.status(200).json_body(json!({"name": "models/embedding-001"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1beta/models/gemini-2.5-pro");
            then.status(404);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let health = coordinator(&config(&server, dir.path())).health_check().await;

    assert!(health.embedding);
    assert!(!health.llm);
}
