//! Mock result sink for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::ingest::{ResultSink, SinkError};

/// Mock implementation of the ResultSink trait for `String` results.
///
/// Results are keyed by the text before the first `:` or, when the result
/// is a `payload-N` string, by `row-N`, so the sink pairs naturally with
/// [`MockSource`](super::MockSource) rows.
///
/// Provides controllable behavior for testing:
/// - Preload keys that count as already present
/// - Fail the write of a specific key
/// - Count successful writes to detect double writes
#[derive(Debug, Default)]
pub struct MockSink {
    entries: Mutex<BTreeMap<String, String>>,
    writes: Mutex<u64>,
    fail_key: Mutex<Option<String>>,
}

impl MockSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark keys as already present.
    pub fn preload<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.insert(key.to_string(), String::new());
        }
    }

    /// Make writes for this key fail.
    pub fn fail_on_write(&self, key: &str) {
        *self.fail_key.lock().unwrap() = Some(key.to_string());
    }

    /// Stop failing writes.
    pub fn clear_failure(&self) {
        *self.fail_key.lock().unwrap() = None;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Number of stored entries, preloaded keys included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock().unwrap()
    }

    /// Stored results, ordered by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn key_of(result: &str) -> String {
        if let Some(index) = result.strip_prefix("payload-") {
            return format!("row-{}", index);
        }
        result.split(':').next().unwrap_or(result).to_string()
    }
}

impl ResultSink<String> for MockSink {
    fn exists(&self, key: &str) -> Result<bool, SinkError> {
        Ok(self.contains(key))
    }

    fn write(&self, result: String) -> Result<(), SinkError> {
        let key = Self::key_of(&result);
        if self.fail_key.lock().unwrap().as_deref() == Some(key.as_str()) {
            return Err(SinkError::Write(format!("mock write of {} failed", key)));
        }

        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&key) {
            return Err(SinkError::Write(format!("duplicate write of {}", key)));
        }
        entries.insert(key, result);
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
