//! Search request types.

use serde::{Deserialize, Serialize};

use crate::search::filter::SearchFilter;

fn default_limit() -> usize {
    10
}

/// How a query is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Nearest neighbours of the query embedding, ranked by distance.
    #[default]
    Semantic,
    /// Case-insensitive substring match in the metadata store, in store order.
    Exact,
}

/// A logical search request.
///
/// Serializes flat: `{"query": .., "limit": .., "school": .., ...,
/// "exact_words": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(flatten)]
    pub filter: SearchFilter,
    #[serde(default)]
    pub exact_words: bool,
}

impl SearchRequest {
    /// A semantic request with the default limit and no filter.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_limit(),
            filter: SearchFilter::default(),
            exact_words: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_exact_words(mut self, exact_words: bool) -> Self {
        self.exact_words = exact_words;
        self
    }

    pub fn mode(&self) -> SearchMode {
        if self.exact_words {
            SearchMode::Exact
        } else {
            SearchMode::Semantic
        }
    }
}
