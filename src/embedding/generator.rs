//! Text-to-vector conversion with input-length handling.

use std::sync::Arc;

use log::{debug, error, info};

use crate::analysis::chunker::chunk_text_with;
use crate::analysis::token::{TokenCounter, default_counter};
use crate::embedding::backend::EmbeddingBackend;
use crate::error::{ProfileSearchError, Result};
use crate::vector::Vector;

/// Default per-request token budget of OpenAI embedding models.
pub const DEFAULT_MAX_TOKENS: usize = 8192;

/// Generates one embedding per text, chunking over-budget input.
///
/// Text within `max_tokens` is sent to the backend as-is. Longer text is cut
/// into token-bounded chunks, each chunk is embedded in order, and the chunk
/// vectors are averaged component-wise (mean pooling). Every chunk weighs the
/// same regardless of its length.
pub struct EmbeddingGenerator {
    backend: Arc<dyn EmbeddingBackend>,
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
    dimension: usize,
}

impl EmbeddingGenerator {
    /// Create a generator using the default token counter and budget.
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        let dimension = backend.dimension();
        info!(
            "Initialized embedding generator for model {} ({dimension} dimensions)",
            backend.name()
        );
        Self {
            backend,
            counter: default_counter(),
            max_tokens: DEFAULT_MAX_TOKENS,
            dimension,
        }
    }

    /// Override the per-request token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// Override the token counter.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Dimension of every vector this generator returns.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Token count of `text` under this generator's counter.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Embed `text`, chunking and mean-pooling when it exceeds the budget.
    ///
    /// Any backend failure aborts the whole call.
    pub async fn generate_embedding(&self, text: &str) -> Result<Vector> {
        let token_count = self.counter.count(text);
        if token_count <= self.max_tokens {
            return self.call_backend(text).await;
        }

        let chunks = chunk_text_with(self.counter.as_ref(), text, self.max_tokens);
        info!(
            "Text of {token_count} tokens chunked into {} parts",
            chunks.len()
        );

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            embeddings.push(self.call_backend(chunk).await?);
        }

        debug!("Aggregating {} embeddings using mean pooling", embeddings.len());
        mean_pool(&embeddings).inspect_err(|e| error!("Failed to aggregate embeddings: {e}"))
    }

    async fn call_backend(&self, text: &str) -> Result<Vector> {
        let vector = self
            .backend
            .embed(text)
            .await
            .inspect_err(|e| error!("Error generating embedding: {e}"))?;
        vector.validate_dimension(self.dimension)?;
        Ok(vector)
    }
}

/// Component-wise arithmetic mean of `vectors`.
///
/// Fails on empty input or when the vectors do not all share one dimension.
pub fn mean_pool(vectors: &[Vector]) -> Result<Vector> {
    let first = vectors
        .first()
        .ok_or_else(|| ProfileSearchError::embedding("cannot aggregate zero embeddings"))?;
    let dimension = first.dimension();

    let mut sums = vec![0.0f64; dimension];
    for vector in vectors {
        vector.validate_dimension(dimension)?;
        for (sum, value) in sums.iter_mut().zip(&vector.data) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Ok(Vector::new(
        sums.into_iter().map(|sum| (sum / count) as f32).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::HeuristicTokenCounter;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Returns `[len(text), 1.0, calls]` and records every input.
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl EmbeddingBackend for RecordingBackend {
        async fn embed(&self, text: &str) -> Result<Vector> {
            let mut calls = self.calls.lock();
            calls.push(text.to_string());
            if self.fail_on == Some(calls.len()) {
                return Err(ProfileSearchError::embedding("API ERROR"));
            }
            Ok(Vector::new(vec![
                text.len() as f32,
                1.0,
                calls.len() as f32,
            ]))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct WrongDimensionBackend;

    #[async_trait]
    impl EmbeddingBackend for WrongDimensionBackend {
        async fn embed(&self, _text: &str) -> Result<Vector> {
            Ok(Vector::new(vec![0.0; 2]))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_mean_pool_two_vectors() {
        let pooled = mean_pool(&[
            Vector::new(vec![1.0, 2.0, 3.0]),
            Vector::new(vec![4.0, 5.0, 6.0]),
        ])
        .unwrap();
        assert_eq!(pooled.data, vec![2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_mean_pool_rejects_empty_and_ragged() {
        assert!(mean_pool(&[]).is_err());
        assert!(matches!(
            mean_pool(&[Vector::new(vec![1.0, 2.0]), Vector::new(vec![1.0])]),
            Err(ProfileSearchError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_within_budget_calls_backend_once() {
        let backend = Arc::new(RecordingBackend::new());
        let generator = EmbeddingGenerator::new(backend.clone()).with_max_tokens(100);

        let vector = generator.generate_embedding("test text").await.unwrap();
        assert_eq!(vector.data, vec![9.0, 1.0, 1.0]);
        assert_eq!(*backend.calls.lock(), vec!["test text".to_string()]);
    }

    #[tokio::test]
    async fn test_over_budget_chunks_in_order_and_averages() {
        let backend = Arc::new(RecordingBackend::new());
        let generator = EmbeddingGenerator::new(backend.clone())
            .with_max_tokens(2)
            .with_token_counter(Arc::new(HeuristicTokenCounter::new(100)));

        let vector = generator
            .generate_embedding("alpha beta gamma")
            .await
            .unwrap();

        assert_eq!(
            *backend.calls.lock(),
            vec!["alpha beta".to_string(), "gamma".to_string()]
        );
        // [10, 1, 1] and [5, 1, 2]
        assert_eq!(vector.data, vec![7.5, 1.0, 1.5]);
    }

    #[tokio::test]
    async fn test_chunk_failure_aborts_whole_call() {
        let backend = Arc::new(RecordingBackend {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(2),
        });
        let generator = EmbeddingGenerator::new(backend.clone())
            .with_max_tokens(1)
            .with_token_counter(Arc::new(HeuristicTokenCounter::new(100)));

        let err = generator
            .generate_embedding("one two three")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_backend_dimension_is_enforced() {
        let generator = EmbeddingGenerator::new(Arc::new(WrongDimensionBackend));
        assert!(matches!(
            generator.generate_embedding("x").await,
            Err(ProfileSearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
