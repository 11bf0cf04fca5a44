//! The vector index backend trait.

use crate::error::Result;
use crate::vector::Vector;

/// An append-only store of fixed-dimension vectors addressed by insertion order.
///
/// Ids are dense and zero-based: the `n`-th appended vector gets id `n - 1`.
/// There is no update or delete of a single vector; [`clear`](Self::clear)
/// drops everything and restarts numbering at zero.
///
/// Implementations are not internally synchronised for writers. Callers that
/// append from more than one place must serialise those calls (the search
/// engine holds a write lock across each append).
pub trait VectorIndexBackend: Send + Sync {
    /// Dimension every stored vector has.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector, make it durable and return its id.
    ///
    /// Either the vector is both stored and persisted, or an error is
    /// returned and the index is unchanged.
    fn append(&mut self, vector: &Vector) -> Result<u64>;

    /// Return the vectors for `ids`, in the given order.
    ///
    /// Any id `>= len()` is an error.
    fn reconstruct_batch(&self, ids: &[u64]) -> Result<Vec<Vector>>;

    /// Exact search over every stored vector.
    ///
    /// Returns at most `top_k` ids ordered by ascending squared L2 distance,
    /// ties broken by ascending id.
    fn search_all(&self, query: &Vector, top_k: usize) -> Result<Vec<u64>>;

    /// Drop all vectors. The next appended vector gets id 0.
    fn clear(&mut self) -> Result<()>;
}
