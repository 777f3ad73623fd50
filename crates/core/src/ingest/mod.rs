//! Resumable batch ingestion.
//!
//! An [`Ingestor`] pages through a [`RowSource`] in fixed-size batches,
//! skips rows whose natural key is already present in the [`ResultSink`],
//! transforms the rest and checkpoints a durable cursor through a
//! [`CursorStore`] after every batch.

mod error;
mod runner;
mod traits;
mod types;

pub use error::{CursorError, IngestAborted, IngestError, SinkError, SourceError, TransformError};
pub use runner::{run, Ingestor};
pub use traits::{CursorStore, Record, ResultSink, RowSource, Transform};
pub use types::{IngestOptions, RunSummary};
