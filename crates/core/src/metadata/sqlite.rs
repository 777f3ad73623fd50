//! SQLite-backed torrent metadata store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{MetadataError, TorrentMetadata, REGULAR_TORRENT};
use crate::ingest::{ResultSink, RowSource, SinkError, SourceError};

const SELECT_COLUMNS: &str = "rowid, infohash, title, size_bytes, category, metadata_type, \
     torrent_date, tracker_info, seeders, leechers";

/// Which rows a [`MetadataSource`] pages through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    /// Only rows of this metadata type.
    pub metadata_type: i64,
    /// Case-insensitive substring the title must contain.
    pub title_contains: Option<String>,
}

impl Default for MetadataQuery {
    fn default() -> Self {
        Self {
            metadata_type: REGULAR_TORRENT,
            title_contains: None,
        }
    }
}

impl MetadataQuery {
    pub fn with_metadata_type(mut self, metadata_type: i64) -> Self {
        self.metadata_type = metadata_type;
        self
    }

    pub fn with_title_contains(mut self, text: impl Into<String>) -> Self {
        self.title_contains = Some(text.into());
        self
    }
}

/// SQLite-backed torrent metadata store.
///
/// Serves as a row source (through [`MetadataSource`]) and as a sink that
/// inserts torrents missing from the database.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open a metadata database, creating the file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, MetadataError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory metadata store (useful for testing).
    pub fn in_memory() -> Result<Self, MetadataError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MetadataError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS torrent_metadata (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                infohash TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                category TEXT,
                metadata_type INTEGER NOT NULL DEFAULT 300,
                torrent_date TEXT,
                tracker_info TEXT,
                seeders INTEGER NOT NULL DEFAULT 0,
                leechers INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_torrent_metadata_type ON torrent_metadata(metadata_type);
            "#,
        )?;
        Ok(())
    }

    fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<TorrentMetadata> {
        let size_bytes: i64 = row.get(3)?;
        let torrent_date: Option<String> = row.get(6)?;

        // Unparseable dates are dropped rather than failing the whole page
        let torrent_date = torrent_date.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        Ok(TorrentMetadata {
            rowid: Some(row.get(0)?),
            infohash: row.get(1)?,
            title: row.get(2)?,
            size_bytes: size_bytes.max(0) as u64,
            category: row.get(4)?,
            metadata_type: row.get(5)?,
            torrent_date,
            tracker_info: row.get(7)?,
            seeders: row.get(8)?,
            leechers: row.get(9)?,
        })
    }

    /// Insert a torrent, keeping its health fields.
    ///
    /// Returns `false` when a torrent with the same infohash already exists.
    pub fn insert(&self, torrent: &TorrentMetadata) -> Result<bool, MetadataError> {
        if !super::is_valid_infohash(&torrent.infohash) {
            return Err(MetadataError::InvalidInfohash(torrent.infohash.clone()));
        }

        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO torrent_metadata
                (infohash, title, size_bytes, category, metadata_type, torrent_date, tracker_info, seeders, leechers)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                torrent.infohash.to_lowercase(),
                torrent.title,
                torrent.size_bytes as i64,
                torrent.category,
                torrent.metadata_type,
                torrent.torrent_date.map(|d| d.to_rfc3339()),
                torrent.tracker_info,
                torrent.seeders,
                torrent.leechers,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Get a torrent by infohash.
    pub fn get(&self, infohash: &str) -> Result<Option<TorrentMetadata>, MetadataError> {
        let conn = self.conn.lock().unwrap();
        let torrent = conn
            .query_row(
                &format!(
                    "SELECT {} FROM torrent_metadata WHERE infohash = ?",
                    SELECT_COLUMNS
                ),
                params![infohash.to_lowercase()],
                Self::row_to_torrent,
            )
            .optional()?;
        Ok(torrent)
    }

    /// Whether a torrent with this infohash exists.
    pub fn contains(&self, infohash: &str) -> Result<bool, MetadataError> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM torrent_metadata WHERE infohash = ?",
                params![infohash.to_lowercase()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Count rows matching the query.
    pub fn count(&self, query: &MetadataQuery) -> Result<u64, MetadataError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM torrent_metadata
             WHERE metadata_type = ?1 AND (?2 IS NULL OR title LIKE '%' || ?2 || '%')",
            params![query.metadata_type, query.title_contains],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Fetch one page of rows matching the query, ordered by row id.
    pub fn page(
        &self,
        query: &MetadataQuery,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TorrentMetadata>, MetadataError> {
        // Negative values would make SQLite restart from row 0 or drop the limit
        let offset = i64::try_from(offset).map_err(|_| MetadataError::OutOfRange {
            name: "offset",
            value: offset,
        })?;
        let limit = i64::try_from(limit).map_err(|_| MetadataError::OutOfRange {
            name: "limit",
            value: limit,
        })?;

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM torrent_metadata
             WHERE metadata_type = ?1 AND (?2 IS NULL OR title LIKE '%' || ?2 || '%')
             ORDER BY rowid LIMIT ?3 OFFSET ?4",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![
                query.metadata_type,
                query.title_contains,
                limit,
                offset
            ],
            Self::row_to_torrent,
        )?;

        let mut torrents = Vec::new();
        for row in rows {
            torrents.push(row?);
        }
        Ok(torrents)
    }

    /// A row source over this store.
    pub fn source(&self, query: MetadataQuery) -> MetadataSource<'_> {
        MetadataSource { store: self, query }
    }
}

impl ResultSink<TorrentMetadata> for SqliteMetadataStore {
    fn exists(&self, key: &str) -> Result<bool, SinkError> {
        self.contains(key).map_err(|e| SinkError::Lookup {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn write(&self, result: TorrentMetadata) -> Result<(), SinkError> {
        self.insert(&result.portable())
            .map(|_| ())
            .map_err(|e| SinkError::Write(e.to_string()))
    }
}

/// Paginated view over a [`SqliteMetadataStore`].
pub struct MetadataSource<'a> {
    store: &'a SqliteMetadataStore,
    query: MetadataQuery,
}

impl MetadataSource<'_> {
    pub fn query(&self) -> &MetadataQuery {
        &self.query
    }
}

impl RowSource for MetadataSource<'_> {
    type Row = TorrentMetadata;

    fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<TorrentMetadata>, SourceError> {
        self.store
            .page(&self.query, offset, limit)
            .map_err(|e| SourceError::Unavailable(e.to_string()))
    }
}
