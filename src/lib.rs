//! # profile-search
//!
//! Semantic search over researcher profiles.
//!
//! Profiles are embedded into fixed-dimension vectors and stored in a flat,
//! persisted vector index whose ids are assigned densely in insertion order.
//! Structured labels (school, department, funding) live in a separate
//! metadata store that links each profile to its vector id.
//!
//! ## Features
//!
//! - Exact nearest-neighbour search by squared L2 distance
//! - Metadata-filtered search restricted to a candidate id set
//! - Exact-substring search over profile free text
//! - Token-budgeted embedding with chunking and mean pooling
//! - Crash-safe index persistence with checksums
//!
//! ```
//! use profile_search::search::{SearchFilter, SearchRequest};
//!
//! let request = SearchRequest::new("protein folding")
//!     .with_limit(5)
//!     .with_filter(SearchFilter::new().with_school("SOM").with_has_funding(true));
//! assert!(!request.filter.is_empty());
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod metadata;
pub mod population;
pub mod profile;
pub mod search;
pub mod storage;
pub mod vector;

pub mod prelude {
    pub use crate::config::ProfileSearchConfig;
    pub use crate::embedding::{EmbeddingBackend, EmbeddingGenerator};
    pub use crate::error::{ProfileSearchError, Result};
    pub use crate::metadata::{MemoryMetadataStore, MetadataStore};
    pub use crate::population::{IngestReport, Populator};
    pub use crate::profile::{ProfileRecord, Project};
    pub use crate::search::{SearchEngine, SearchFilter, SearchMode, SearchRequest};
    pub use crate::storage::{FileStorage, MemoryStorage, Storage, StorageConfig};
    pub use crate::vector::{FlatVectorIndex, Vector, VectorIndexBackend};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
