//! Tag types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tag store operations.
#[derive(Debug, Error)]
pub enum TagStoreError {
    /// Database error.
    #[error("Tag database error: {0}")]
    Database(String),

    /// The creator pool must hold at least one identity.
    #[error("Creator pool cannot be empty")]
    EmptyCreatorPool,
}

impl From<rusqlite::Error> for TagStoreError {
    fn from(e: rusqlite::Error) -> Self {
        TagStoreError::Database(e.to_string())
    }
}

/// Tags derived for one torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagBatch {
    pub infohash: String,
    pub tags: Vec<String>,
}

/// Kind of a tag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOperationKind {
    Add,
    Remove,
}

impl TagOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagOperationKind::Add => "add",
            TagOperationKind::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(TagOperationKind::Add),
            "remove" => Some(TagOperationKind::Remove),
            _ => None,
        }
    }
}

/// A persisted tag operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOperation {
    pub infohash: String,
    pub tag: String,
    pub operation: TagOperationKind,
    /// Lamport-style clock per (infohash, tag, creator).
    pub clock: u64,
    /// Hex identity of the peer the operation is attributed to.
    pub creator: String,
    pub created_at: DateTime<Utc>,
}
