//! Filtered vector search engine.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::analysis::preprocess::{preprocess_profile, preprocess_query};
use crate::embedding::EmbeddingGenerator;
use crate::error::{ProfileSearchError, Result};
use crate::metadata::MetadataStore;
use crate::profile::ProfileRecord;
use crate::search::filter::SearchFilter;
use crate::search::request::{SearchMode, SearchRequest};
use crate::vector::{Vector, VectorIndexBackend, rank_nearest};

/// Orchestrates embedding, the vector index and the metadata store.
///
/// The engine owns the vector index. Reads (searches) share a read lock;
/// each append or clear holds the write lock for the whole
/// mutate-and-persist step, so concurrent writers are serialised.
pub struct SearchEngine<I, M: ?Sized> {
    generator: EmbeddingGenerator,
    index: RwLock<I>,
    metadata: Arc<M>,
}

impl<I, M> SearchEngine<I, M>
where
    I: VectorIndexBackend,
    M: MetadataStore + ?Sized,
{
    /// Assemble an engine. The generator and index must agree on dimension.
    pub fn new(generator: EmbeddingGenerator, index: I, metadata: Arc<M>) -> Result<Self> {
        if generator.dimension() != index.dimension() {
            return Err(ProfileSearchError::dimension_mismatch(
                index.dimension(),
                generator.dimension(),
            ));
        }
        Ok(Self {
            generator,
            index: RwLock::new(index),
            metadata,
        })
    }

    pub fn generator(&self) -> &EmbeddingGenerator {
        &self.generator
    }

    pub fn metadata(&self) -> &Arc<M> {
        &self.metadata
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.index.read().dimension()
    }

    /// Run a search request and return matching vector ids.
    ///
    /// Semantic requests are ranked by distance; exact-word requests come
    /// back in the metadata store's order. An empty query is rejected before
    /// any backend is contacted.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<u64>> {
        let query = canonical_query(&request.query)?;
        info!(
            "Performing {:?} search for query {query:?} (limit {})",
            request.mode(),
            request.limit
        );
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let results = match request.mode() {
            SearchMode::Semantic => {
                let query_vector = self.generator.generate_embedding(&query).await?;
                self.search_vector(&query_vector, &request.filter, request.limit)?
            }
            SearchMode::Exact => {
                self.metadata
                    .ids_matching_substring(&query, &request.filter, request.limit)?
            }
        };

        info!("Search completed. {} results found", results.len());
        Ok(results)
    }

    /// Nearest neighbours of an already-embedded query.
    ///
    /// With an empty filter this is a full-index search. Otherwise the
    /// metadata store's candidate ids are bounded by the index size and only
    /// those vectors are ranked.
    pub fn search_vector(
        &self,
        query: &Vector,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<u64>> {
        if !query.is_valid() {
            return Err(ProfileSearchError::invalid_query(
                "query vector contains NaN or infinite values",
            ));
        }
        if filter.is_empty() {
            return self.index.read().search_all(query, top_k);
        }
        self.filtered_search(query, filter, top_k)
    }

    fn filtered_search(
        &self,
        query: &Vector,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<u64>> {
        let candidates = self.metadata.ids_matching(filter)?;

        let index = self.index.read();
        query.validate_dimension(index.dimension())?;

        let size = index.len() as u64;
        let candidate_count = candidates.len();
        let mut valid_ids: Vec<u64> = candidates.into_iter().filter(|&id| id < size).collect();
        valid_ids.sort_unstable();
        valid_ids.dedup();

        if valid_ids.len() < candidate_count {
            debug!(
                "Dropped {} candidate ids outside the index or duplicated",
                candidate_count - valid_ids.len()
            );
        }
        if valid_ids.is_empty() {
            warn!("No matching embeddings found after filtering");
            return Ok(Vec::new());
        }

        let vectors = index.reconstruct_batch(&valid_ids)?;
        Ok(rank_nearest(
            &query.data,
            valid_ids
                .iter()
                .copied()
                .zip(vectors.iter().map(|v| v.data.as_slice())),
            top_k,
        ))
    }

    /// Embed `record` and append its vector; returns the new vector id.
    ///
    /// The caller links the id to the record in the metadata store
    /// afterwards (see [`Populator`](crate::population::Populator)).
    pub async fn index_profile(&self, record: &ProfileRecord) -> Result<u64> {
        info!("Starting embedding generation for profile {}", record.name);
        let text = preprocess_profile(record);
        let vector = self.generator.generate_embedding(&text).await?;
        self.append_vector(&vector)
    }

    /// Append a vector under the write lock.
    pub fn append_vector(&self, vector: &Vector) -> Result<u64> {
        self.index.write().append(vector)
    }

    /// Drop every vector from the index.
    pub fn clear_index(&self) -> Result<()> {
        self.index.write().clear()
    }
}

fn canonical_query(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(ProfileSearchError::invalid_query(
            "query must be a non-empty string",
        ));
    }
    let query = preprocess_query(raw);
    if query.is_empty() {
        return Err(ProfileSearchError::invalid_query(format!(
            "query {raw:?} has no searchable characters"
        )));
    }
    Ok(query)
}
