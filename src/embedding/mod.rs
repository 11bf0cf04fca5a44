//! Embedding generation.
//!
//! [`EmbeddingBackend`] is the narrow seam to an external model;
//! [`EmbeddingGenerator`] adds token-budget handling on top of it.

pub mod backend;
pub mod generator;
#[cfg(feature = "embeddings-openai")]
pub mod openai;

pub use backend::EmbeddingBackend;
pub use generator::{DEFAULT_MAX_TOKENS, EmbeddingGenerator, mean_pool};
