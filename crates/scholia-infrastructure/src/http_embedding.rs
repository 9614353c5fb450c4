//! HTTP-backed embedding provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use scholia_core::relevance::EmbeddingProvider;
use scholia_core::{Result, ScholiaError};

use crate::config::EmbeddingEndpointConfig;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider speaking a simple batch HTTP contract: an ordered
/// list of input texts in, a parallel ordered list of vectors out.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingProvider {
    /// Creates a provider from the embedding section of the configuration.
    pub fn new(config: &EmbeddingEndpointConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(batch = texts.len(), model = %self.model, "requesting embeddings");

        let mut request = self.client.post(&self.endpoint).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: EmbedResponse = response.json().await?;

        if body.embeddings.len() != texts.len() {
            return Err(ScholiaError::embedding(format!(
                "embedding service returned {} vectors for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }
        Ok(body.embeddings)
    }
}
