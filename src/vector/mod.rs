//! Dense vectors and the exact nearest-neighbour index.
//!
//! All distances are squared Euclidean (L2²). Lower is closer; equal
//! distances are ordered by ascending id so results are deterministic.

pub mod flat;
pub mod index;
pub mod io;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileSearchError, Result};

pub use flat::FlatVectorIndex;
pub use index::VectorIndexBackend;

/// A dense vector representation for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// The vector components.
    pub data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from its components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Validate that this vector has the expected dimension.
    pub fn validate_dimension(&self, expected_dim: usize) -> Result<()> {
        if self.data.len() != expected_dim {
            return Err(ProfileSearchError::dimension_mismatch(
                expected_dim,
                self.data.len(),
            ));
        }
        Ok(())
    }

    /// Check that no component is NaN or infinite.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Squared Euclidean distance to `other`.
    pub fn squared_l2(&self, other: &Vector) -> Result<f32> {
        other.validate_dimension(self.dimension())?;
        Ok(squared_l2(&self.data, &other.data))
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

/// Squared Euclidean distance between two equal-length slices.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn by_distance_then_id(a: &(f32, u64), b: &(f32, u64)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

/// Rank `(id, row)` candidates against `query` and return the ids of the
/// `min(top_k, candidates)` closest rows.
///
/// Both full-index and filtered searches go through here so they share one
/// ordering rule.
pub(crate) fn rank_nearest<'a, I>(query: &[f32], candidates: I, top_k: usize) -> Vec<u64>
where
    I: IntoIterator<Item = (u64, &'a [f32])>,
{
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, u64)> = candidates
        .into_iter()
        .map(|(id, row)| (squared_l2(query, row), id))
        .collect();

    if top_k < scored.len() {
        scored.select_nth_unstable_by(top_k, by_distance_then_id);
        scored.truncate(top_k);
    }
    scored.sort_by(by_distance_then_id);

    scored.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn test_vector_dimension_validation() {
        let v = Vector::new(vec![0.0; 3]);
        assert!(v.validate_dimension(3).is_ok());
        assert!(matches!(
            v.validate_dimension(4),
            Err(ProfileSearchError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_vector_squared_l2_rejects_mismatched_dimensions() {
        let a = Vector::new(vec![1.0, 0.0]);
        let b = Vector::new(vec![1.0, 0.0, 0.0]);
        assert!(a.squared_l2(&b).is_err());
    }

    #[test]
    fn test_invalid_values_detected() {
        assert!(Vector::new(vec![1.0, 2.0]).is_valid());
        assert!(!Vector::new(vec![f32::NAN]).is_valid());
        assert!(!Vector::new(vec![f32::INFINITY]).is_valid());
    }

    #[test]
    fn test_rank_nearest_breaks_ties_by_id() {
        let rows: Vec<(u64, Vec<f32>)> = vec![
            (5, vec![1.0, 0.0]),
            (2, vec![0.0, 1.0]),
            (9, vec![1.0, 0.0]),
            (1, vec![3.0, 3.0]),
        ];
        let ranked = rank_nearest(
            &[1.0, 0.0],
            rows.iter().map(|(id, row)| (*id, row.as_slice())),
            3,
        );
        assert_eq!(ranked, vec![5, 9, 2]);
    }

    #[test]
    fn test_rank_nearest_caps_at_candidate_count() {
        let rows = [vec![0.0], vec![1.0]];
        let ranked = rank_nearest(
            &[0.0],
            rows.iter().enumerate().map(|(i, r)| (i as u64, r.as_slice())),
            10,
        );
        assert_eq!(ranked, vec![0, 1]);
        let ranked = rank_nearest(
            &[0.0],
            rows.iter().enumerate().map(|(i, r)| (i as u64, r.as_slice())),
            0,
        );
        assert!(ranked.is_empty());
    }
}
