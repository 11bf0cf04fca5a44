//! The metadata collaborator.
//!
//! Profiles (structured fields, free text, funding) live in a store separate
//! from the vector index. Each profile carries the id of its vector as a
//! foreign key. The search engine only ever asks the store two questions:
//! which vector ids match a filter, and which match a text fragment.

pub mod memory;

use crate::error::Result;
use crate::profile::ProfileRecord;
use crate::search::filter::SearchFilter;

pub use memory::MemoryMetadataStore;

/// Contract the search engine and population workflow need from a metadata
/// store.
pub trait MetadataStore: Send + Sync {
    /// Vector ids of every record matching `filter`.
    ///
    /// The ids may include values the vector index does not (yet) hold;
    /// callers must bound them by the index size.
    fn ids_matching(&self, filter: &SearchFilter) -> Result<Vec<u64>>;

    /// Vector ids of records matching `filter` whose free text contains
    /// `text` (case-insensitive), in the store's native order, at most
    /// `top_k` of them.
    fn ids_matching_substring(
        &self,
        text: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<u64>>;

    /// Persist a record. The record must already carry its embedding id.
    fn insert(&self, record: ProfileRecord) -> Result<()>;

    /// Look up the record linked to vector `embedding_id`.
    fn get_by_embedding_id(&self, embedding_id: u64) -> Result<Option<ProfileRecord>>;

    /// Delete every record.
    fn clear(&self) -> Result<()>;

    /// Number of records.
    fn len(&self) -> Result<usize>;
}
