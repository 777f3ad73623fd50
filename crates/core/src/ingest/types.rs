//! Options and summaries for ingestion runs.

use serde::{Deserialize, Serialize};

/// Tunables for a single ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Rows fetched per batch; also the cursor increment per checkpoint.
    pub batch_size: u64,
    /// Stop once the cursor advanced this many rows past its start.
    pub max_rows: Option<u64>,
    /// Log a progress line every time the cursor crosses a multiple of this.
    pub progress_every: u64,
}

impl IngestOptions {
    pub fn new(batch_size: u64) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every;
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_rows: None,
            progress_every: 1000,
        }
    }
}

/// Counts gathered during an ingestion run.
///
/// Reported on both normal and fatal termination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Name of the job that produced this summary.
    pub job: String,
    /// Cursor value loaded at start.
    pub start_cursor: u64,
    /// Last persisted cursor value.
    pub end_cursor: u64,
    /// Batches fully processed and checkpointed.
    pub batches: u64,
    /// Rows returned by the source.
    pub fetched: u64,
    /// Results written to the sink.
    pub written: u64,
    /// Rows skipped because the sink already had their key.
    pub skipped_existing: u64,
    /// Rows for which the transform produced nothing.
    pub skipped_filtered: u64,
    /// Rows whose transform failed.
    pub failed: u64,
}

impl RunSummary {
    pub fn new(job: impl Into<String>, start_cursor: u64) -> Self {
        Self {
            job: job.into(),
            start_cursor,
            end_cursor: start_cursor,
            ..Self::default()
        }
    }

    /// Rows that produced a sink write.
    pub fn processed(&self) -> u64 {
        self.written
    }

    /// Rows skipped without error.
    pub fn skipped(&self) -> u64 {
        self.skipped_existing + self.skipped_filtered
    }
}
