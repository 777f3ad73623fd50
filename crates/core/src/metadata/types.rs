//! Torrent metadata rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::Record;

/// Metadata type of a regular torrent entry.
pub const REGULAR_TORRENT: i64 = 300;

/// Error type for metadata store operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Database error.
    #[error("Metadata database error: {0}")]
    Database(String),

    /// The infohash is not 40 hex digits.
    #[error("Invalid infohash: {0:?}")]
    InvalidInfohash(String),

    /// A paging value does not fit in an SQLite integer.
    #[error("{name} {value} is out of range")]
    OutOfRange { name: &'static str, value: u64 },
}

impl From<rusqlite::Error> for MetadataError {
    fn from(e: rusqlite::Error) -> Self {
        MetadataError::Database(e.to_string())
    }
}

/// One torrent row of a metadata database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentMetadata {
    /// Row id local to the database the row was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowid: Option<i64>,
    /// Lowercase hex infohash; the natural key.
    pub infohash: String,
    pub title: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub category: Option<String>,
    pub metadata_type: i64,
    #[serde(default)]
    pub torrent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tracker_info: Option<String>,
    /// Health, local to the database the row was read from.
    #[serde(default)]
    pub seeders: u32,
    #[serde(default)]
    pub leechers: u32,
}

impl TorrentMetadata {
    /// Create a regular torrent entry with empty optional fields.
    pub fn new(infohash: impl Into<String>, title: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            rowid: None,
            infohash: infohash.into(),
            title: title.into(),
            size_bytes,
            category: None,
            metadata_type: REGULAR_TORRENT,
            torrent_date: None,
            tracker_info: None,
            seeders: 0,
            leechers: 0,
        }
    }

    /// Copy of this entry without database-local fields (row id and health).
    pub fn portable(&self) -> Self {
        Self {
            rowid: None,
            seeders: 0,
            leechers: 0,
            ..self.clone()
        }
    }
}

impl Record for TorrentMetadata {
    fn key(&self) -> &str {
        &self.infohash
    }
}

/// Whether `s` is a 40-digit hex infohash.
pub fn is_valid_infohash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
