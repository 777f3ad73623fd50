//! In-memory cursor store.

use std::sync::Mutex;

use crate::ingest::{CursorError, CursorStore};

/// Non-durable cursor store.
///
/// Used for one-shot runs that should always start from the beginning, and
/// in tests, where the history of saved values is useful for assertions.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    value: Mutex<u64>,
    saved: Mutex<Vec<u64>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `cursor`.
    pub fn starting_at(cursor: u64) -> Self {
        Self {
            value: Mutex::new(cursor),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Current value.
    pub fn value(&self) -> u64 {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every value passed to `save`, in order.
    pub fn saved(&self) -> Vec<u64> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget the current value, as if the cursor were lost.
    pub fn reset(&self) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = 0;
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Result<u64, CursorError> {
        Ok(self.value())
    }

    fn save(&self, cursor: u64) -> Result<(), CursorError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = cursor;
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cursor);
        Ok(())
    }
}
