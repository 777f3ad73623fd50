//! Mock row source for testing.

use std::sync::Mutex;

use crate::ingest::{Record, RowSource, SourceError};

/// A row produced by [`MockSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRow {
    /// Position in the source (0-based).
    pub index: u64,
    /// Natural key, `row-{index}`.
    pub key: String,
    /// Payload carried through transforms.
    pub payload: String,
}

impl TestRow {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            key: format!("row-{}", index),
            payload: format!("payload-{}", index),
        }
    }
}

impl Record for TestRow {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Mock implementation of the RowSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve a fixed list of rows with `LIMIT/OFFSET` semantics
/// - Record every fetch for assertions
/// - Fail a specific fetch with `SourceError::Unavailable`
///
/// # Example
///
/// ```rust,ignore
/// use harvester_core::testing::MockSource;
///
/// let source = MockSource::with_rows(130);
/// source.fail_on_fetch(3);
///
/// let rows = source.fetch(0, 50)?;
/// assert_eq!(rows.len(), 50);
/// assert_eq!(source.fetches(), vec![(0, 50)]);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    rows: Mutex<Vec<TestRow>>,
    fetches: Mutex<Vec<(u64, u64)>>,
    /// 1-based fetch number that fails.
    fail_on: Mutex<Option<usize>>,
}

impl MockSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source with `count` rows keyed `row-0..row-{count-1}`.
    pub fn with_rows(count: u64) -> Self {
        let source = Self::new();
        *source.rows.lock().unwrap() = (0..count).map(TestRow::new).collect();
        source
    }

    /// Append rows to the end of the source.
    pub fn push_rows(&self, rows: impl IntoIterator<Item = TestRow>) {
        self.rows.lock().unwrap().extend(rows);
    }

    /// Make the n-th fetch (1-based, counted from creation) fail.
    pub fn fail_on_fetch(&self, n: usize) {
        *self.fail_on.lock().unwrap() = Some(n);
    }

    /// Stop failing fetches.
    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// All `(offset, limit)` pairs requested so far, failed ones included.
    pub fn fetches(&self) -> Vec<(u64, u64)> {
        self.fetches.lock().unwrap().clone()
    }
}

impl RowSource for MockSource {
    type Row = TestRow;

    fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<TestRow>, SourceError> {
        let mut fetches = self.fetches.lock().unwrap();
        fetches.push((offset, limit));

        if *self.fail_on.lock().unwrap() == Some(fetches.len()) {
            return Err(SourceError::Unavailable(format!(
                "mock fetch #{} failed",
                fetches.len()
            )));
        }

        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
