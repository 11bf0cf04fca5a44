//! OpenAI-compatible embeddings backend.
//!
//! Requires the `embeddings-openai` feature (enabled by default).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::backend::EmbeddingBackend;
use crate::error::{ProfileSearchError, Result};
use crate::vector::Vector;

/// Request body for `POST /v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding backend for OpenAI's Embeddings API and compatible servers.
///
/// # Examples
///
/// ```no_run
/// use profile_search::embedding::EmbeddingBackend;
/// use profile_search::embedding::openai::OpenAiEmbeddingBackend;
///
/// # async fn example() -> profile_search::error::Result<()> {
/// let backend = OpenAiEmbeddingBackend::new(
///     std::env::var("OPENAI_API_KEY").unwrap_or_default(),
///     "text-embedding-ada-002",
/// )?;
/// let vector = backend.embed("protein folding").await?;
/// assert_eq!(vector.dimension(), 1536);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiEmbeddingBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingBackend {
    /// Create a backend for one of the known OpenAI embedding models.
    ///
    /// - `text-embedding-ada-002` - 1536 dimensions
    /// - `text-embedding-3-small` - 1536 dimensions
    /// - `text-embedding-3-large` - 3072 dimensions
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let dimension = Self::default_dimension(&model).ok_or_else(|| {
            ProfileSearchError::invalid_config(format!(
                "Unknown OpenAI embedding model: {model}. Supported models: \
                 text-embedding-ada-002, text-embedding-3-small, text-embedding-3-large \
                 (use with_dimension for other models)"
            ))
        })?;
        Ok(Self::with_dimension(api_key, model, dimension))
    }

    /// Create a backend for any model with an explicit output dimension.
    pub fn with_dimension(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            model: model.into(),
            dimension,
        }
    }

    /// Point the backend at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn default_dimension(model: &str) -> Option<usize> {
        match model {
            "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
            "text-embedding-3-large" => Some(3072),
            _ => None,
        }
    }

    fn endpoint(&self) -> String {
        embeddings_endpoint(&self.base_url)
    }
}

fn embeddings_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/embeddings") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/embeddings")
    } else {
        format!("{base}/v1/embeddings")
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vector> {
        // ada-002 rejects the `dimensions` parameter.
        let dimensions = match Self::default_dimension(&self.model) {
            Some(default) if default == self.dimension => None,
            _ if self.model == "text-embedding-ada-002" => None,
            _ => Some(self.dimension),
        };

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions,
        };

        let http_response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProfileSearchError::embedding(format!("API request failed: {e}")))?;

        let status = http_response.status();
        let response_text = http_response.text().await.map_err(|e| {
            ProfileSearchError::embedding(format!("Failed to read response text: {e}"))
        })?;

        if !status.is_success() {
            return Err(ProfileSearchError::embedding(format!(
                "API error (status {status}): {response_text}"
            )));
        }

        let response: EmbeddingResponse = serde_json::from_str(&response_text).map_err(|e| {
            ProfileSearchError::embedding(format!("Failed to parse embeddings response: {e}"))
        })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProfileSearchError::embedding("No embedding in response"))?
            .embedding;

        Ok(Vector::new(embedding))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}
