//! In-process metadata store, optionally persisted as JSON lines.

use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;

use crate::error::{ProfileSearchError, Result};
use crate::metadata::MetadataStore;
use crate::profile::ProfileRecord;
use crate::search::filter::SearchFilter;
use crate::storage::Storage;

/// Reference [`MetadataStore`] keeping records in insertion order.
///
/// With a backing [`Storage`], the full record list is rewritten as one JSON
/// object per line after every insert and clear.
pub struct MemoryMetadataStore {
    records: RwLock<Vec<ProfileRecord>>,
    storage: Option<(Arc<dyn Storage>, String)>,
}

impl fmt::Debug for MemoryMetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMetadataStore")
            .field("records", &self.records.read().len())
            .field("file_name", &self.storage.as_ref().map(|(_, name)| name))
            .finish()
    }
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMetadataStore {
    /// Create an empty, purely in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            storage: None,
        }
    }

    /// Open the store persisted as `file_name`; a missing file starts empty.
    ///
    /// Unlike the vector index, an unparsable metadata file is an error:
    /// silently dropping records would orphan their vectors.
    pub fn open(storage: Arc<dyn Storage>, file_name: impl Into<String>) -> Result<Self> {
        let file_name = file_name.into();
        let records = if storage.file_exists(&file_name) {
            let bytes = storage.read_file(&file_name)?;
            let records = parse_json_lines(&bytes)?;
            info!("Loaded {} profile records from {file_name}", records.len());
            records
        } else {
            warn!("No metadata file at {file_name}; starting empty");
            Vec::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            storage: Some((storage, file_name)),
        })
    }

    fn persist(&self, records: &[ProfileRecord]) -> Result<()> {
        let Some((storage, file_name)) = &self.storage else {
            return Ok(());
        };
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        storage
            .write_file(file_name, &buf)
            .map_err(|e| ProfileSearchError::metadata(format!("{file_name}: {e}")))
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Vec<ProfileRecord> {
        self.records.read().clone()
    }
}

fn parse_json_lines(bytes: &[u8]) -> Result<Vec<ProfileRecord>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ProfileSearchError::metadata(format!("metadata file is not UTF-8: {e}")))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                ProfileSearchError::metadata(format!("metadata line {}: {e}", n + 1))
            })
        })
        .collect()
}

impl MetadataStore for MemoryMetadataStore {
    fn ids_matching(&self, filter: &SearchFilter) -> Result<Vec<u64>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .filter_map(|record| record.embedding_id)
            .collect())
    }

    fn ids_matching_substring(
        &self,
        text: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<u64>> {
        let needle = text.to_lowercase();
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .filter(|record| {
                record
                    .free_text_fields()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .filter_map(|record| record.embedding_id)
            .take(top_k)
            .collect())
    }

    fn insert(&self, record: ProfileRecord) -> Result<()> {
        let embedding_id = record.embedding_id.ok_or_else(|| {
            ProfileSearchError::metadata(format!(
                "profile {} has no embedding id; append its vector first",
                record.name
            ))
        })?;

        let mut records = self.records.write();
        if records.iter().any(|r| r.embedding_id == Some(embedding_id)) {
            return Err(ProfileSearchError::metadata(format!(
                "embedding id {embedding_id} is already linked to another profile"
            )));
        }

        records.push(record);
        if let Err(e) = self.persist(&records) {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    fn get_by_embedding_id(&self, embedding_id: u64) -> Result<Option<ProfileRecord>> {
        let record = self
            .records
            .read()
            .iter()
            .find(|r| r.embedding_id == Some(embedding_id))
            .cloned();
        if record.is_none() {
            warn!("No profile record found with embedding id {embedding_id}");
        }
        Ok(record)
    }

    fn clear(&self) -> Result<()> {
        let mut records = self.records.write();
        self.persist(&[])?;
        let deleted = records.len();
        records.clear();
        info!("Deleted {deleted} profile records");
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}
