//! SQLite-backed named cursors.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::ingest::{CursorError, CursorStore};

/// Cursor stored as a named row in an SQLite database.
///
/// Several jobs can share one database file, each under its own name.
pub struct SqliteCursorStore {
    conn: Mutex<Connection>,
    name: String,
}

impl SqliteCursorStore {
    /// Open (or create) the database at `path` and use the cursor `name`.
    pub fn new(path: &Path, name: impl Into<String>) -> Result<Self, CursorError> {
        let conn = Connection::open(path).map_err(|e| CursorError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            name: name.into(),
        })
    }

    /// Create an in-memory cursor store (useful for testing).
    pub fn in_memory(name: impl Into<String>) -> Result<Self, CursorError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CursorError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            name: name.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CursorError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ingest_cursors (
                name TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| CursorError::Database(e.to_string()))
    }
}

impl CursorStore for SqliteCursorStore {
    fn load(&self) -> Result<u64, CursorError> {
        let conn = self.conn.lock().unwrap();
        let position: Option<i64> = conn
            .query_row(
                "SELECT position FROM ingest_cursors WHERE name = ?",
                params![self.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CursorError::Database(e.to_string()))?;

        match position {
            None => Ok(0),
            Some(p) => u64::try_from(p).map_err(|_| CursorError::Corrupt {
                value: p.to_string(),
            }),
        }
    }

    fn save(&self, cursor: u64) -> Result<(), CursorError> {
        let position = i64::try_from(cursor).map_err(|_| CursorError::Corrupt {
            value: cursor.to_string(),
        })?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ingest_cursors (name, position, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET position = excluded.position, updated_at = excluded.updated_at",
            params![self.name, position, Utc::now().to_rfc3339()],
        )
        .map_err(|e| CursorError::Database(e.to_string()))?;
        Ok(())
    }
}
