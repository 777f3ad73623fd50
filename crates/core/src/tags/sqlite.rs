//! SQLite-backed tag store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{TagBatch, TagOperation, TagOperationKind, TagStoreError};
use crate::ingest::{ResultSink, SinkError};

/// Default number of creator identities tags are spread over.
pub const DEFAULT_CREATOR_POOL: usize = 1000;

/// Deterministic hex identity for creator `index` of a pool seeded with `seed`.
pub fn creator_identity(seed: &str, index: usize) -> String {
    format!("{:x}", Sha256::digest(format!("{}:{}", seed, index).as_bytes()))
}

/// SQLite-backed tag store.
///
/// Every tag of a [`TagBatch`] becomes one `add` operation, attributed to the
/// next identity of a rotating creator pool.
pub struct SqliteTagStore {
    conn: Mutex<Connection>,
    creators: Vec<String>,
    next_creator: Mutex<usize>,
}

impl SqliteTagStore {
    /// Open a tag database, creating the file and tables if needed.
    pub fn new(path: &Path, creator_seed: &str, pool_size: usize) -> Result<Self, TagStoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, creator_seed, pool_size)
    }

    /// Create an in-memory tag store (useful for testing).
    pub fn in_memory(creator_seed: &str, pool_size: usize) -> Result<Self, TagStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, creator_seed, pool_size)
    }

    fn with_connection(
        conn: Connection,
        creator_seed: &str,
        pool_size: usize,
    ) -> Result<Self, TagStoreError> {
        if pool_size == 0 {
            return Err(TagStoreError::EmptyCreatorPool);
        }
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            creators: (0..pool_size)
                .map(|i| creator_identity(creator_seed, i))
                .collect(),
            next_creator: Mutex::new(0),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TagStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tag_operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                infohash TEXT NOT NULL,
                tag TEXT NOT NULL,
                operation TEXT NOT NULL,
                clock INTEGER NOT NULL,
                creator TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(infohash, tag, creator)
            );

            CREATE INDEX IF NOT EXISTS idx_tag_operations_infohash ON tag_operations(infohash);
            CREATE INDEX IF NOT EXISTS idx_tag_operations_tag ON tag_operations(tag);
            "#,
        )?;
        Ok(())
    }

    /// Record one `add` operation per tag, atomically.
    pub fn add_tags(&self, batch: &TagBatch) -> Result<(), TagStoreError> {
        let infohash = batch.infohash.to_lowercase();
        let now = Utc::now().to_rfc3339();

        let mut conn = self.conn.lock().unwrap();
        // Rotation only advances once the transaction is committed
        let mut next_creator = self.next_creator.lock().unwrap();
        let mut index = *next_creator;

        let tx = conn.transaction()?;
        for tag in &batch.tags {
            let creator = &self.creators[index];
            index = (index + 1) % self.creators.len();
            let clock: i64 = tx.query_row(
                "SELECT COALESCE(MAX(clock), 0) FROM tag_operations
                 WHERE infohash = ? AND tag = ? AND creator = ?",
                params![infohash, tag, creator],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO tag_operations (infohash, tag, operation, clock, creator, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(infohash, tag, creator) DO UPDATE SET
                    operation = excluded.operation,
                    clock = excluded.clock,
                    created_at = excluded.created_at",
                params![
                    infohash,
                    tag,
                    TagOperationKind::Add.as_str(),
                    clock + 1,
                    creator,
                    now
                ],
            )?;
        }
        tx.commit()?;
        *next_creator = index;
        debug!(infohash = %infohash, tags = batch.tags.len(), "Added tags");
        Ok(())
    }

    /// Whether any operation exists for this infohash.
    pub fn has_tags(&self, infohash: &str) -> Result<bool, TagStoreError> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM tag_operations WHERE infohash = ? LIMIT 1",
                params![infohash.to_lowercase()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Distinct tags currently added to an infohash, alphabetically.
    pub fn tags_for(&self, infohash: &str) -> Result<Vec<String>, TagStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT tag FROM tag_operations
             WHERE infohash = ? AND operation = 'add' ORDER BY tag",
        )?;
        let rows = stmt.query_map(params![infohash.to_lowercase()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// All operations recorded for an infohash, in insertion order.
    pub fn operations_for(&self, infohash: &str) -> Result<Vec<TagOperation>, TagStoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT infohash, tag, operation, clock, creator, created_at
             FROM tag_operations WHERE infohash = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![infohash.to_lowercase()], |row| {
            let operation: String = row.get(2)?;
            let clock: i64 = row.get(3)?;
            let created_at: String = row.get(5)?;
            Ok(TagOperation {
                infohash: row.get(0)?,
                tag: row.get(1)?,
                operation: TagOperationKind::parse(&operation).unwrap_or(TagOperationKind::Add),
                clock: clock.max(0) as u64,
                creator: row.get(4)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut operations = Vec::new();
        for row in rows {
            operations.push(row?);
        }
        Ok(operations)
    }

    /// Total number of stored operations.
    pub fn operation_count(&self) -> Result<u64, TagStoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM tag_operations", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ResultSink<TagBatch> for SqliteTagStore {
    fn exists(&self, key: &str) -> Result<bool, SinkError> {
        self.has_tags(key).map_err(|e| SinkError::Lookup {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn write(&self, result: TagBatch) -> Result<(), SinkError> {
        self.add_tags(&result)
            .map_err(|e| SinkError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn batch(tags: &[&str]) -> TagBatch {
        TagBatch {
            infohash: HASH.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_creator_identity_is_deterministic() {
        assert_eq!(creator_identity("seed", 3), creator_identity("seed", 3));
        assert_ne!(creator_identity("seed", 3), creator_identity("seed", 4));
        assert_eq!(creator_identity("seed", 0).len(), 64);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            SqliteTagStore::in_memory("seed", 0),
            Err(TagStoreError::EmptyCreatorPool)
        ));
    }

    #[test]
    fn test_add_tags_one_operation_per_tag() {
        let store = SqliteTagStore::in_memory("seed", 10).unwrap();
        store.add_tags(&batch(&["dystopia", "replicant"])).unwrap();

        assert_eq!(store.operation_count().unwrap(), 2);
        assert_eq!(store.tags_for(HASH).unwrap(), vec!["dystopia", "replicant"]);

        let ops = store.operations_for(HASH).unwrap();
        assert!(ops.iter().all(|op| op.operation == TagOperationKind::Add));
        assert!(ops.iter().all(|op| op.clock == 1));
    }

    #[test]
    fn test_creators_rotate() {
        let store = SqliteTagStore::in_memory("seed", 2).unwrap();
        store.add_tags(&batch(&["a", "b", "c"])).unwrap();

        let creators: Vec<String> = store
            .operations_for(HASH)
            .unwrap()
            .into_iter()
            .map(|op| op.creator)
            .collect();
        assert_eq!(creators[0], creator_identity("seed", 0));
        assert_eq!(creators[1], creator_identity("seed", 1));
        assert_eq!(creators[2], creator_identity("seed", 0));
    }

    #[test]
    fn test_failed_batch_does_not_advance_creators() {
        let store = SqliteTagStore::in_memory("seed", 3).unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON tag_operations
                 WHEN NEW.tag = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        assert!(store.add_tags(&batch(&["a", "bad"])).is_err());
        assert_eq!(store.operation_count().unwrap(), 0);

        store.add_tags(&batch(&["c"])).unwrap();
        let ops = store.operations_for(HASH).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].creator, creator_identity("seed", 0));

        store.add_tags(&batch(&["d"])).unwrap();
        let ops = store.operations_for(HASH).unwrap();
        assert_eq!(ops[1].creator, creator_identity("seed", 1));
    }

    #[test]
    fn test_clock_increments_for_same_creator() {
        let store = SqliteTagStore::in_memory("seed", 1).unwrap();
        store.add_tags(&batch(&["paris"])).unwrap();
        store.add_tags(&batch(&["paris"])).unwrap();

        let ops = store.operations_for(HASH).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].clock, 2);
    }

    #[test]
    fn test_sink_exists_after_write() {
        let store = SqliteTagStore::in_memory("seed", 5).unwrap();
        assert!(!store.exists(HASH).unwrap());
        store.write(batch(&["heist"])).unwrap();
        assert!(store.exists(HASH).unwrap());
        assert!(store.exists(&HASH.to_uppercase()).unwrap());
    }
}
