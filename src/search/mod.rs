//! Semantic and exact-word search with metadata filters.

pub mod engine;
pub mod filter;
pub mod request;

pub use engine::SearchEngine;
pub use filter::SearchFilter;
pub use request::{SearchMode, SearchRequest};
