//! Text analysis: token counting, chunking and canonicalization.

pub mod chunker;
pub mod preprocess;
pub mod token;

pub use chunker::{chunk_text, chunk_text_with};
pub use preprocess::{preprocess_profile, preprocess_query};
pub use token::{
    BpeTokenCounter, HeuristicTokenCounter, TokenCounter, count_tokens, default_counter,
};
