//! Error types for the ingestion loop.

use thiserror::Error;

use super::RunSummary;

/// Errors raised by a row source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The external system could not be reached or failed to answer.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a result sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Checking whether a key already exists failed.
    #[error("Failed to look up key {key}: {reason}")]
    Lookup { key: String, reason: String },

    /// Writing a result failed.
    #[error("Failed to write result: {0}")]
    Write(String),
}

/// Errors raised by a cursor store.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The stored value is not a valid cursor.
    #[error("Corrupt cursor value {value:?}")]
    Corrupt { value: String },

    /// I/O error while reading or writing the cursor file.
    #[error("Cursor I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error.
    #[error("Cursor database error: {0}")]
    Database(String),
}

/// Error produced while transforming a single record.
///
/// Never fatal: the ingestor counts the record as failed and moves on.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Fatal errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Batch size must be positive.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(u64),

    /// The next checkpoint does not fit in a cursor.
    #[error("Cursor {cursor} cannot advance by {batch_size}")]
    CursorOverflow { cursor: u64, batch_size: u64 },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// A fatal error together with the counts gathered before it happened.
#[derive(Debug, Error)]
#[error("Ingestion aborted at cursor {}: {error}", summary.end_cursor)]
pub struct IngestAborted {
    pub summary: RunSummary,
    #[source]
    pub error: IngestError,
}

impl IngestAborted {
    /// Whether a later run can be expected to succeed from the last checkpoint.
    pub fn is_retryable(&self) -> bool {
        matches!(self.error, IngestError::Source(_) | IngestError::Sink(_))
    }
}
