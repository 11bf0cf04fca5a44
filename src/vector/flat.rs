//! Flat (brute-force) vector index with synchronous persistence.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::{ProfileSearchError, Result};
use crate::storage::Storage;
use crate::vector::index::VectorIndexBackend;
use crate::vector::io::{decode_index, encode_index};
use crate::vector::{Vector, rank_nearest};

/// Exact-search vector index stored as one contiguous row-major buffer.
///
/// When opened against a [`Storage`], every successful [`append`] and
/// [`clear`] rewrites the whole index file before returning. An index built
/// with [`FlatVectorIndex::in_memory`] never touches storage.
///
/// [`append`]: VectorIndexBackend::append
/// [`clear`]: VectorIndexBackend::clear
pub struct FlatVectorIndex {
    dimension: usize,
    data: Vec<f32>,
    storage: Option<Arc<dyn Storage>>,
    file_name: String,
}

impl fmt::Debug for FlatVectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatVectorIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .field("file_name", &self.file_name)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

impl FlatVectorIndex {
    /// Create an empty index that lives only in memory.
    pub fn in_memory(dimension: usize) -> Result<Self> {
        Self::check_dimension(dimension)?;
        Ok(Self {
            dimension,
            data: Vec::new(),
            storage: None,
            file_name: String::new(),
        })
    }

    /// Load the index persisted as `file_name`, or start empty.
    ///
    /// A missing, unreadable or corrupt file is logged and replaced by an
    /// empty index of `dimension`; nothing is written until the first append
    /// or clear. A valid file written with another dimension is a
    /// configuration error and is left on disk untouched.
    pub fn open(
        storage: Arc<dyn Storage>,
        file_name: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        Self::check_dimension(dimension)?;
        let file_name = file_name.into();

        let data = match Self::load(storage.as_ref(), &file_name) {
            Ok((stored_dimension, _)) if stored_dimension != dimension => {
                error!(
                    "Vector index {file_name} holds {stored_dimension}-dimensional vectors, \
                     configured dimension is {dimension}"
                );
                return Err(ProfileSearchError::dimension_mismatch(
                    dimension,
                    stored_dimension,
                ));
            }
            Ok((_, data)) => {
                info!(
                    "Loaded vector index {file_name} with {} vectors",
                    data.len() / dimension
                );
                data
            }
            Err(e) => {
                warn!("No usable vector index at {file_name} ({e}); creating a new one");
                Vec::new()
            }
        };

        Ok(Self {
            dimension,
            data,
            storage: Some(storage),
            file_name,
        })
    }

    fn load(storage: &dyn Storage, file_name: &str) -> Result<(usize, Vec<f32>)> {
        let bytes = storage.read_file(file_name)?;
        decode_index(&bytes)
    }

    fn check_dimension(dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(ProfileSearchError::invalid_config(
                "vector dimension must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Name of the backing file, empty for in-memory indexes.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Write the current contents to storage. No-op for in-memory indexes.
    pub fn persist(&self) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        debug!("Saving vector index to {}", self.file_name);
        let bytes = encode_index(self.dimension, &self.data)?;
        storage
            .write_file(&self.file_name, &bytes)
            .map_err(|e| ProfileSearchError::persistence(format!("{}: {e}", self.file_name)))
    }

    fn row(&self, id: usize) -> &[f32] {
        let start = id * self.dimension;
        &self.data[start..start + self.dimension]
    }

    fn rows(&self) -> impl Iterator<Item = (u64, &[f32])> {
        self.data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(id, row)| (id as u64, row))
    }
}

impl VectorIndexBackend for FlatVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn append(&mut self, vector: &Vector) -> Result<u64> {
        vector.validate_dimension(self.dimension)?;
        if !vector.is_valid() {
            return Err(ProfileSearchError::index(
                "vector contains invalid values (NaN or infinity)",
            ));
        }

        let id = self.len() as u64;
        let previous_len = self.data.len();
        self.data.extend_from_slice(&vector.data);

        if let Err(e) = self.persist() {
            self.data.truncate(previous_len);
            error!("Error adding vector {id}: {e}");
            return Err(e);
        }

        debug!("Appended vector {id}");
        Ok(id)
    }

    fn reconstruct_batch(&self, ids: &[u64]) -> Result<Vec<Vector>> {
        let len = self.len() as u64;
        ids.iter()
            .map(|&id| {
                if id >= len {
                    return Err(ProfileSearchError::index(format!(
                        "vector id {id} out of range (index holds {len})"
                    )));
                }
                Ok(Vector::new(self.row(id as usize).to_vec()))
            })
            .collect()
    }

    fn search_all(&self, query: &Vector, top_k: usize) -> Result<Vec<u64>> {
        query.validate_dimension(self.dimension)?;
        Ok(rank_nearest(&query.data, self.rows(), top_k))
    }

    fn clear(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.data);
        if let Err(e) = self.persist() {
            self.data = previous;
            error!("Error clearing vector index: {e}");
            return Err(e);
        }
        info!("Cleared vector index {}", self.file_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn scenario_index() -> FlatVectorIndex {
        let mut index = FlatVectorIndex::in_memory(4).unwrap();
        index.append(&Vector::new(vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        index.append(&Vector::new(vec![0.0, 1.0, 0.0, 0.0])).unwrap();
        index.append(&Vector::new(vec![1.0, 0.0, 0.0, 0.01])).unwrap();
        index
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut index = FlatVectorIndex::in_memory(2).unwrap();
        for i in 0..5 {
            let id = index.append(&Vector::new(vec![i as f32, 0.0])).unwrap();
            assert_eq!(id, i);
        }
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_search_all_scenario() {
        let index = scenario_index();
        let ids = index
            .search_all(&Vector::new(vec![1.0, 0.0, 0.0, 0.0]), 2)
            .unwrap();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_search_all_top_k_larger_than_index() {
        let index = scenario_index();
        let ids = index
            .search_all(&Vector::new(vec![0.0, 1.0, 0.0, 0.0]), 10)
            .unwrap();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn test_search_all_rejects_wrong_dimension() {
        let index = scenario_index();
        assert!(matches!(
            index.search_all(&Vector::new(vec![1.0, 0.0]), 1),
            Err(ProfileSearchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_append_rejects_wrong_dimension_and_invalid_values() {
        let mut index = FlatVectorIndex::in_memory(3).unwrap();
        assert!(index.append(&Vector::new(vec![1.0, 2.0])).is_err());
        assert!(index.append(&Vector::new(vec![1.0, f32::NAN, 0.0])).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_reconstruct_batch_preserves_requested_order() {
        let index = scenario_index();
        let vectors = index.reconstruct_batch(&[2, 0]).unwrap();
        assert_eq!(vectors[0].data, vec![1.0, 0.0, 0.0, 0.01]);
        assert_eq!(vectors[1].data, vec![1.0, 0.0, 0.0, 0.0]);
        assert!(index.reconstruct_batch(&[3]).is_err());
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let mut index = FlatVectorIndex::in_memory(2).unwrap();
        for _ in 0..5 {
            index.append(&Vector::new(vec![1.0, 1.0])).unwrap();
        }
        index.clear().unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.append(&Vector::new(vec![0.0, 0.0])).unwrap(), 0);
    }

    #[test]
    fn test_append_persists_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut index = FlatVectorIndex::open(storage.clone(), "index.psvi", 2).unwrap();
        index.append(&Vector::new(vec![0.5, -0.5])).unwrap();
        index.append(&Vector::new(vec![0.25, 0.75])).unwrap();

        let reloaded = FlatVectorIndex::open(storage, "index.psvi", 2).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.reconstruct_batch(&[1]).unwrap()[0].data,
            vec![0.25, 0.75]
        );
    }

    #[test]
    fn test_failed_persist_rolls_back_append() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn Storage> = memory.clone();
        let mut index = FlatVectorIndex::open(storage, "index.psvi", 2).unwrap();
        index.append(&Vector::new(vec![1.0, 1.0])).unwrap();

        memory.set_fail_writes(true);
        let err = index.append(&Vector::new(vec![2.0, 2.0])).unwrap_err();
        assert!(matches!(err, ProfileSearchError::Persistence(_)));
        assert_eq!(index.len(), 1);

        memory.set_fail_writes(false);
        assert_eq!(index.append(&Vector::new(vec![3.0, 3.0])).unwrap(), 1);
    }

    #[test]
    fn test_open_rejects_dimension_mismatch_and_keeps_file() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut index = FlatVectorIndex::open(storage.clone(), "index.psvi", 2).unwrap();
        for i in 0..3 {
            index.append(&Vector::new(vec![i as f32, 1.0])).unwrap();
        }
        let persisted = storage.read_file("index.psvi").unwrap();

        let err = FlatVectorIndex::open(storage.clone(), "index.psvi", 3).unwrap_err();
        assert!(matches!(
            err,
            ProfileSearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(storage.read_file("index.psvi").unwrap(), persisted);

        let reopened = FlatVectorIndex::open(storage, "index.psvi", 2).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(
            reopened.reconstruct_batch(&[2]).unwrap()[0].data,
            vec![2.0, 1.0]
        );
    }

    #[test]
    fn test_open_falls_back_on_garbage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.write_file("index.psvi", b"not an index").unwrap();
        let index = FlatVectorIndex::open(storage, "index.psvi", 4).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(FlatVectorIndex::in_memory(0).is_err());
    }
}
