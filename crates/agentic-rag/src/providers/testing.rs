//! In-process providers for agent and route tests

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EmbeddingProvider, LlmProvider};
use crate::error::{Error, Result};

/// Deterministic bag-of-letters embedder
///
/// Each text maps to letter frequencies over `a..=z` plus a constant bias
/// component, so texts sharing words score higher under cosine similarity.
#[derive(Default)]
pub struct FakeEmbedder {
    failing: Vec<String>,
    truncated: Vec<String>,
    calls: Mutex<usize>,
}

impl FakeEmbedder {
    pub const DIMENSIONS: usize = 27;

    /// Fail for any text containing one of `markers`
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            failing: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Return a vector of the wrong length for any text containing one of `markers`
    pub fn truncating_on(markers: &[&str]) -> Self {
        Self {
            truncated: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; Self::DIMENSIONS];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        v[Self::DIMENSIONS - 1] = 0.5;
        v
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        *self.calls.lock() += 1;
        if self.failing.iter().any(|m| text.contains(m.as_str())) {
            return Err(Error::embedding(format!("refused to embed '{}'", text)));
        }
        let mut vector = Self::vector(text);
        if self.truncated.iter().any(|m| text.contains(m.as_str())) {
            vector.truncate(3);
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake-embedding"
    }
}

/// LLM that records prompts and replies with a canned answer
pub struct FakeLlm {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `Error::Llm`
    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.answer
            .clone()
            .ok_or_else(|| Error::llm("model unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.answer.is_some())
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
