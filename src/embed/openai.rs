//! OpenAI-compatible embedding backend

use super::Embedder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::openai::{OpenAiClient, ProviderError};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Embedder backed by the `/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimension: usize,
    retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        client: OpenAiClient,
        model: impl Into<String>,
        dimension: usize,
        retries: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            dimension,
            retries,
        }
    }

    /// Build an embedder from the `[embedding]` config section
    pub fn from_config(config: &Config, client: OpenAiClient) -> Self {
        Self::new(
            client,
            config.embedding.model.clone(),
            config.embedding.resolved_dimension(),
            config.embedding.retries,
        )
    }

    async fn send_with_retry(&self, request: RequestBuilder) -> Result<EmbeddingResponse> {
        let mut last_err: Option<ProviderError> = None;
        for attempt in 0..=self.retries {
            let req = request
                .try_clone()
                .ok_or_else(|| Error::Embedding("Failed to clone embedding request".to_string()))?;

            match self.client.send_json::<EmbeddingResponse>(req).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    warn!(attempt = attempt + 1, error = %e, "Embedding request failed; retrying");
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
                }
                Err(e) => return Err(Error::Embedding(e.to_string())),
            }
        }

        Err(Error::Embedding(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Embedding request failed".to_string()),
        ))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: &texts,
        };
        let request = self.client.post("embeddings")?.json(&body);
        let mut response = self.send_with_retry(request).await?;

        if response.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                bad.len()
            )));
        }

        debug!(count = vectors.len(), model = %self.model, "Embedded batch");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
