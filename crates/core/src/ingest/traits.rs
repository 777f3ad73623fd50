//! Capabilities the ingestor is driven by.

use super::{CursorError, SinkError, SourceError, TransformError};

/// A row with a caller-defined natural key used for deduplication.
pub trait Record {
    fn key(&self) -> &str;
}

/// An ordered, externally numbered row source.
pub trait RowSource {
    type Row: Record;

    /// Fetch up to `limit` rows starting at the 0-based `offset`.
    ///
    /// Equivalent to `LIMIT limit OFFSET offset` over a stable ordering.
    /// An empty result means the source is exhausted.
    fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Self::Row>, SourceError>;
}

impl<T: RowSource + ?Sized> RowSource for &T {
    type Row = T::Row;

    fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Self::Row>, SourceError> {
        (**self).fetch(offset, limit)
    }
}

/// Destination for transformed results.
pub trait ResultSink<O> {
    /// Whether a result for this natural key is already present.
    fn exists(&self, key: &str) -> Result<bool, SinkError>;

    /// Persist a result.
    fn write(&self, result: O) -> Result<(), SinkError>;
}

impl<O, T: ResultSink<O> + ?Sized> ResultSink<O> for &T {
    fn exists(&self, key: &str) -> Result<bool, SinkError> {
        (**self).exists(key)
    }

    fn write(&self, result: O) -> Result<(), SinkError> {
        (**self).write(result)
    }
}

/// Durable storage for a single cursor value.
pub trait CursorStore {
    /// Load the cursor, or 0 when nothing was saved yet.
    fn load(&self) -> Result<u64, CursorError>;

    /// Atomically replace the stored cursor.
    fn save(&self, cursor: u64) -> Result<(), CursorError>;
}

impl<T: CursorStore + ?Sized> CursorStore for &T {
    fn load(&self) -> Result<u64, CursorError> {
        (**self).load()
    }

    fn save(&self, cursor: u64) -> Result<(), CursorError> {
        (**self).save(cursor)
    }
}

impl<T: CursorStore + ?Sized> CursorStore for Box<T> {
    fn load(&self) -> Result<u64, CursorError> {
        (**self).load()
    }

    fn save(&self, cursor: u64) -> Result<(), CursorError> {
        (**self).save(cursor)
    }
}

/// Pure per-record transformation.
///
/// Returns `Ok(None)` for records that should be skipped without error.
pub trait Transform<R, O> {
    fn apply(&self, row: &R) -> Result<Option<O>, TransformError>;
}

impl<R, O, F> Transform<R, O> for F
where
    F: Fn(&R) -> Result<Option<O>, TransformError>,
{
    fn apply(&self, row: &R) -> Result<Option<O>, TransformError> {
        self(row)
    }
}
