//! Torrent metadata databases.

mod sqlite;
mod types;

pub use sqlite::{MetadataQuery, MetadataSource, SqliteMetadataStore};
pub use types::{is_valid_infohash, MetadataError, TorrentMetadata, REGULAR_TORRENT};
