//! Embedding backend trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::vector::Vector;

/// Turns one string into one fixed-dimension vector.
///
/// Implementations wrap an external model (an HTTP API, a local model, a
/// test double). Failures are returned as-is; the
/// [`EmbeddingGenerator`](crate::embedding::EmbeddingGenerator) never retries
/// or substitutes a partial result.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use profile_search::embedding::EmbeddingBackend;
/// use profile_search::error::Result;
/// use profile_search::vector::Vector;
///
/// struct ConstantBackend {
///     dimension: usize,
/// }
///
/// #[async_trait]
/// impl EmbeddingBackend for ConstantBackend {
///     async fn embed(&self, _text: &str) -> Result<Vector> {
///         Ok(Vector::new(vec![1.0; self.dimension]))
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
/// }
/// ```
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate an embedding vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Dimension of the vectors this backend produces.
    fn dimension(&self) -> usize;

    /// Model name, for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
