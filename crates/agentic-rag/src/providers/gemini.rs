//! Gemini providers via the Google Generative Language API
//!
//! One shared HTTP client backs both the embedding model (embedding-001)
//! and the chat model (gemini-2.5-pro). Requests authenticate with the
//! `x-goog-api-key` header and retry transport failures, 429 and 5xx
//! responses with exponential backoff.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::llm::LlmProvider;

/// Maximum texts per `batchEmbedContents` request
const MAX_BATCH: usize = 100;

/// Gemini REST client with automatic retry
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

/// Outcome of a failed request attempt
enum Failure {
    Retryable(String),
    Fatal(String),
}

impl GeminiClient {
    /// Create a client; fails when no API key is configured
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay of the backoff; attempt `n` waits `delay * 2^n`
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, path)
    }

    /// POST a JSON body and decode the JSON response, retrying transient failures
    async fn post_json<B, R>(&self, path: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.max_retries {
            match self.try_post(&url, body).await {
                Ok(response) => return Ok(response),
                Err(Failure::Fatal(message)) => return Err(message),
                Err(Failure::Retryable(message)) => {
                    last_error = message;
                    if attempt < self.max_retries {
                        let delay = self.retry_delay * 2u32.pow(attempt);
                        tracing::warn!(
                            "Gemini request failed (attempt {}/{}), retrying in {:?}: {}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay,
                            last_error
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn try_post<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, Failure>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Failure::Retryable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Failure::Retryable(message)
            } else {
                Failure::Fatal(message)
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Failure::Fatal(format!("failed to parse response: {}", e)))
    }

    /// Check that the API key can read the given model
    pub async fn health_check(&self, model: &str) -> Result<bool> {
        let url = self.url(&model_path(model));

        match self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// `embedding-001` -> `models/embedding-001`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(role: Option<&'static str>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Gemini embedding provider
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: model_path(&config.embedding_model),
            dimensions: config.embedding_dimensions,
        }
    }

    async fn embed_with_task(&self, text: &str, task_type: &'static str) -> Result<Vec<f32>> {
        let request = EmbedContentRequest {
            model: self.model.clone(),
            content: Content::text(None, text),
            task_type,
        };

        let response: EmbedContentResponse = self
            .client
            .post_json(&format!("{}:embedContent", self.model), &request)
            .await
            .map_err(|e| Error::Embedding(format!("Gemini embedding failed: {}", e)))?;

        if response.embedding.values.is_empty() {
            return Err(Error::embedding("Gemini returned an empty embedding"));
        }

        Ok(response.embedding.values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_with_task(text, "RETRIEVAL_DOCUMENT").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_with_task(text, "RETRIEVAL_QUERY").await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| EmbedContentRequest {
                        model: self.model.clone(),
                        content: Content::text(None, t),
                        task_type: "RETRIEVAL_DOCUMENT",
                    })
                    .collect(),
            };

            let response: BatchEmbedResponse = self
                .client
                .post_json(&format!("{}:batchEmbedContents", self.model), &request)
                .await
                .map_err(|e| Error::Embedding(format!("Gemini batch embedding failed: {}", e)))?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }

            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check(&self.model).await
    }

    fn name(&self) -> &str {
        "gemini-embedding"
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini chat provider
pub struct GeminiChat {
    client: Arc<GeminiClient>,
    model: String,
    temperature: f32,
}

impl GeminiChat {
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.generation_model.trim_start_matches("models/").to_string(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response: GenerateResponse = self
            .client
            .post_json(&format!("models/{}:generateContent", self.model), &request)
            .await
            .map_err(|e| Error::Llm(format!("Gemini generation failed: {}", e)))?;

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Llm(format!("Prompt blocked by Gemini: {}", reason)));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::llm("No candidates in Gemini response"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Llm(format!(
                "No text in Gemini response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check(&self.model).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build the embedding and chat providers sharing one client
pub fn gemini_providers(
    config: &GeminiConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>)> {
    let client = Arc::new(GeminiClient::new(config)?);
    let embedder = Arc::new(GeminiEmbedder::new(Arc::clone(&client), config));
    let chat = Arc::new(GeminiChat::new(client, config));
    Ok((embedder, chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn config(server: &MockServer, max_retries: u32) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.base_url(),
            max_retries,
            ..GeminiConfig::default()
        }
    }

    fn client(config: &GeminiConfig) -> Arc<GeminiClient> {
        Arc::new(
            GeminiClient::new(config)
                .unwrap()
                .with_retry_delay(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_embed_document_and_query() {
        let server = MockServer::start_async().await;
        let doc_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:embedContent")
                    .header("x-goog-api-key", "test-key")
                    .body_contains("RETRIEVAL_DOCUMENT");
                then.status(200)
                    .json_body(json!({"embedding": {"values": [0.1, 0.2, 0.3]}}));
            })
            .await;
        let query_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:embedContent")
                    .body_contains("RETRIEVAL_QUERY");
                then.status(200)
                    .json_body(json!({"embedding": {"values": [1.0, 0.0, 0.0]}}));
            })
            .await;

        let config = config(&server, 0);
        let embedder = GeminiEmbedder::new(client(&config), &config);

        assert_eq!(embedder.embed("chunk").await.unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(embedder.embed_query("question").await.unwrap(), vec![1.0, 0.0, 0.0]);
        doc_mock.assert_async().await;
        query_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:batchEmbedContents");
                then.status(200).json_body(json!({
                    "embeddings": [{"values": [1.0]}, {"values": [2.0]}]
                }));
            })
            .await;

        let config = config(&server, 0);
        let embedder = GeminiEmbedder::new(client(&config), &config);
        let embeddings = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![1.0], vec![2.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_joins_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-pro:generateContent")
                    .body_contains("Question:");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": "Rust "}, {"text": "is fast."}]},
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let config = config(&server, 0);
        let chat = GeminiChat::new(client(&config), &config);
        let answer = chat.generate("Question:\nwhy rust?").await.unwrap();

        assert_eq!(answer, "Rust is fast.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_without_candidates_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-pro:generateContent");
                then.status(200)
                    .json_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
            })
            .await;

        let config = config(&server, 0);
        let chat = GeminiChat::new(client(&config), &config);
        let err = chat.generate("anything").await.unwrap_err();

        assert!(matches!(err, Error::Llm(ref msg) if msg.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.5-pro:generateContent");
                then.status(503).body("overloaded");
            })
            .await;

        let config = config(&server, 2);
        let chat = GeminiChat::new(client(&config), &config);
        let err = chat.generate("anything").await.unwrap_err();

        assert!(matches!(err, Error::Llm(_)));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:embedContent");
                then.status(400).body("API key not valid");
            })
            .await;

        let config = config(&server, 2);
        let embedder = GeminiEmbedder::new(client(&config), &config);
        let err = embedder.embed("chunk").await.unwrap_err();

        assert!(matches!(err, Error::Embedding(ref msg) if msg.contains("API key not valid")));
        mock.assert_hits_async(1).await;
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = GeminiClient::new(&GeminiConfig::default()).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }
}
