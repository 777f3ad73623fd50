//! Prometheus metrics for ingestion runs.
//!
//! All metrics are labelled by job name so several jobs can share one
//! registry.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, IntGaugeVec, Opts};

/// Rows handled, by outcome.
pub static INGEST_ROWS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_ingest_rows_total", "Rows handled by the ingestor"),
        &["job", "outcome"], // "written", "existing", "filtered", "failed"
    )
    .unwrap()
});

/// Batches processed and checkpointed.
pub static INGEST_BATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "harvester_ingest_batches_total",
            "Batches processed and checkpointed",
        ),
        &["job"],
    )
    .unwrap()
});

/// Last persisted cursor.
pub static INGEST_CURSOR: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("harvester_ingest_cursor", "Last persisted cursor position"),
        &["job"],
    )
    .unwrap()
});

/// Runs finished, by result.
pub static INGEST_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("harvester_ingest_runs_total", "Ingestion runs finished"),
        &["job", "result"], // "completed", "aborted"
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(INGEST_ROWS.clone()),
        Box::new(INGEST_BATCHES.clone()),
        Box::new(INGEST_CURSOR.clone()),
        Box::new(INGEST_RUNS.clone()),
    ]
}
