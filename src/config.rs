//! Configuration for the profile search service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embedding::DEFAULT_MAX_TOKENS;
use crate::error::{ProfileSearchError, Result};

/// Top-level configuration, loadable from a JSON file.
///
/// Every section and field has a default, so a file only needs the values
/// it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSearchConfig {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub population: PopulationConfig,
}

/// Embedding model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name sent to the embeddings endpoint.
    pub model: String,
    /// Length of every vector the model returns.
    pub dimension: usize,
    /// Token budget of a single model request.
    pub max_tokens: usize,
    /// Base URL of the embeddings API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Where the vector index and metadata live on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Instance directory holding both files.
    pub directory: PathBuf,
    /// Vector index file name inside `directory`.
    pub file_name: String,
    /// Metadata file name inside `directory`.
    pub metadata_file_name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("instance"),
            file_name: "index.psvi".to_string(),
            metadata_file_name: "profiles.jsonl".to_string(),
        }
    }
}

/// Population run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Extra embedding attempts per profile.
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl PopulationConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl ProfileSearchConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProfileSearchError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ProfileSearchError::invalid_config(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.model.trim().is_empty() {
            return Err(ProfileSearchError::invalid_config(
                "embedding.model must not be empty",
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ProfileSearchError::invalid_config(
                "embedding.dimension must be positive",
            ));
        }
        if self.embedding.max_tokens == 0 {
            return Err(ProfileSearchError::invalid_config(
                "embedding.max_tokens must be positive",
            ));
        }
        if self.index.file_name.is_empty() || self.index.metadata_file_name.is_empty() {
            return Err(ProfileSearchError::invalid_config(
                "index file names must not be empty",
            ));
        }
        if self.index.file_name == self.index.metadata_file_name {
            return Err(ProfileSearchError::invalid_config(
                "index.file_name and index.metadata_file_name must differ",
            ));
        }
        Ok(())
    }
}
