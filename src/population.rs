//! Population workflow: embed profiles, append vectors, link metadata.
//!
//! The vector index and the metadata store are two stores with no shared
//! transaction. Consistency relies on ordering plus compensation:
//!
//! 1. the vector is appended first, yielding its id;
//! 2. only then is the metadata record inserted, carrying that id;
//! 3. if either write fails, both stores are wiped together.
//!
//! A crash between steps 1 and 2 still leaves an unlinked vector behind;
//! the stores are only guaranteed consistent after a completed run or a
//! completed wipe.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use serde::Serialize;

use crate::analysis::preprocess::preprocess_profile;
use crate::error::Result;
use crate::metadata::MetadataStore;
use crate::profile::ProfileRecord;
use crate::search::SearchEngine;
use crate::vector::{Vector, VectorIndexBackend};

/// Outcome of a population run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Profiles embedded, appended and linked.
    pub indexed: usize,
    /// Duplicate listings folded into an earlier record.
    pub merged: usize,
    /// Names of profiles whose embedding kept failing and were left out.
    pub skipped: Vec<String>,
}

/// Drives a [`SearchEngine`] and its metadata store through a population run.
pub struct Populator<'a, I, M: ?Sized> {
    engine: &'a SearchEngine<I, M>,
    max_retries: usize,
    retry_backoff: Duration,
    today: NaiveDate,
}

impl<'a, I, M> Populator<'a, I, M>
where
    I: VectorIndexBackend,
    M: MetadataStore + ?Sized,
{
    pub fn new(engine: &'a SearchEngine<I, M>) -> Self {
        Self {
            engine,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            today: Local::now().date_naive(),
        }
    }

    /// Extra embedding attempts per profile after the first failure.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay between attempts; doubles after each failure.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Date used to decide whether a project is currently funded.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Wipe both stores.
    pub fn reset(&self) -> Result<()> {
        self.engine.clear_index()?;
        self.engine.metadata().clear()
    }

    /// Index every record.
    ///
    /// Embedding failures are retried per profile; a profile that still
    /// fails is skipped and reported. Any failure to append a vector or to
    /// insert a record wipes both stores and is returned.
    pub async fn ingest(&self, records: Vec<ProfileRecord>) -> Result<IngestReport> {
        let (records, merged) = merge_duplicates(records);
        let mut report = IngestReport {
            merged,
            ..Default::default()
        };

        for mut record in records {
            record.refresh_funding(self.today);

            let Some(vector) = self.embed_with_retry(&record).await? else {
                report.skipped.push(record.name.clone());
                continue;
            };

            if let Err(e) = self.append_and_link(record, &vector) {
                error!("Population failed ({e}); wiping vector index and metadata store");
                self.compensate();
                return Err(e);
            }
            report.indexed += 1;
        }

        info!(
            "Population finished: {} indexed, {} merged, {} skipped",
            report.indexed,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    async fn embed_with_retry(&self, record: &ProfileRecord) -> Result<Option<Vector>> {
        let text = preprocess_profile(record);
        let mut delay = self.retry_backoff;
        let mut attempt = 0;
        loop {
            match self.engine.generator().generate_embedding(&text).await {
                Ok(vector) => return Ok(Some(vector)),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Embedding for {} failed ({e}); retry {attempt}/{}",
                        record.name, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) if e.is_retryable() => {
                    error!("Giving up on {} after {} attempts: {e}", record.name, attempt + 1);
                    return Ok(None);
                }
                Err(e) => {
                    error!("Embedding for {} failed: {e}", record.name);
                    self.compensate();
                    return Err(e);
                }
            }
        }
    }

    fn append_and_link(&self, mut record: ProfileRecord, vector: &Vector) -> Result<()> {
        let id = self.engine.append_vector(vector)?;
        record.embedding_id = Some(id);
        self.engine.metadata().insert(record)
    }

    fn compensate(&self) {
        if let Err(e) = self.engine.clear_index() {
            error!("Failed to clear vector index during recovery: {e}");
        }
        if let Err(e) = self.engine.metadata().clear() {
            error!("Failed to clear metadata store during recovery: {e}");
        }
    }
}

/// Fold repeated listings of the same person (name, school, email) into the
/// first occurrence, merging departments. Returns the records and the number
/// of listings folded.
pub fn merge_duplicates(records: Vec<ProfileRecord>) -> (Vec<ProfileRecord>, usize) {
    let mut merged: Vec<ProfileRecord> = Vec::with_capacity(records.len());
    let mut folded = 0;

    for record in records {
        match merged.iter_mut().find(|r| r.identity() == record.identity()) {
            Some(existing) => {
                existing.merge_department(&record.department);
                folded += 1;
            }
            None => merged.push(record),
        }
    }

    (merged, folded)
}
