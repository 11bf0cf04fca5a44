//! Error types for the profile-search library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`ProfileSearchError`] enum. Variants follow the failure classes of the
//! engine: embedding generation, dimension mismatches, persistence, metadata
//! collaborator failures and malformed queries.
//!
//! # Examples
//!
//! ```
//! use profile_search::error::{ProfileSearchError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(ProfileSearchError::invalid_query("query must not be empty"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for profile-search operations.
#[derive(Error, Debug)]
pub enum ProfileSearchError {
    /// I/O errors (file operations, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Vector index errors (out-of-range ids, corrupt index files, ...)
    #[error("Index error: {0}")]
    Index(String),

    /// A vector whose length differs from the index / model dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding backend failed. Callers may retry.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Writing the index to durable storage failed after an append.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The metadata collaborator failed.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Malformed search input, rejected before any backend call.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Errors raised by third-party loaders (tokenizer vocabularies).
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with ProfileSearchError.
pub type Result<T> = std::result::Result<T, ProfileSearchError>;

impl ProfileSearchError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::Storage(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::Index(msg.into())
    }

    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        ProfileSearchError::DimensionMismatch { expected, actual }
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::Embedding(msg.into())
    }

    /// Create a new persistence error.
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::Persistence(msg.into())
    }

    /// Create a new metadata error.
    pub fn metadata<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::Metadata(msg.into())
    }

    /// Create a new invalid query error.
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::InvalidQuery(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        ProfileSearchError::InvalidConfig(msg.into())
    }

    /// Whether the failed operation may succeed if attempted again.
    ///
    /// Only embedding backend failures are transient; everything else is a
    /// programming, configuration or storage fault.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProfileSearchError::Embedding(_))
    }
}
