//! Testing utilities and in-memory doubles for the ingestion loop.
//!
//! The mocks record what the ingestor asked of them and can be told to fail
//! at a chosen point, which makes crash/restart scenarios easy to script.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_core::ingest::run;
//! use harvester_core::testing::{MemoryCursorStore, MockSink, MockSource, TestRow};
//!
//! let source = MockSource::with_rows(130);
//! let sink = MockSink::new();
//! let cursor = MemoryCursorStore::new();
//!
//! source.fail_on_fetch(3);
//! let aborted = run(&source, &sink, &cursor, 50, &|row: &TestRow| Ok(Some(row.payload.clone())))
//!     .unwrap_err();
//! assert_eq!(cursor.value(), 100);
//! ```

mod mock_sink;
mod mock_source;

pub use crate::cursor::MemoryCursorStore;
pub use mock_sink::MockSink;
pub use mock_source::{MockSource, TestRow};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::metadata::{MetadataError, SqliteMetadataStore, TorrentMetadata};

    /// Deterministic 40-hex-digit infohash for `n`.
    pub fn infohash(n: u64) -> String {
        format!("{:040x}", n)
    }

    /// A regular torrent with reasonable defaults.
    pub fn torrent(n: u64, title: &str) -> TorrentMetadata {
        let mut torrent = TorrentMetadata::new(infohash(n), title, 1024 * 1024 * 700);
        torrent.category = Some("video".to_string());
        torrent.seeders = 25;
        torrent.leechers = 4;
        torrent
    }

    /// Episode-style release names, cycling through a few shows.
    pub fn release_name(n: u64) -> String {
        const SHOWS: [&str; 3] = ["The.Wire", "Fargo", "Blade.Runner"];
        let show = SHOWS[(n % SHOWS.len() as u64) as usize];
        format!("{}.S{:02}E{:02}.720p.HDTV-GRP", show, n / 10 + 1, n % 10 + 1)
    }

    /// Create (or reopen) a metadata database at `path` holding `count`
    /// torrents named by [`release_name`].
    pub fn seeded_metadata_store(
        path: &Path,
        count: u64,
    ) -> Result<SqliteMetadataStore, MetadataError> {
        let store = SqliteMetadataStore::new(path)?;
        for n in 0..count {
            store.insert(&torrent(n, &release_name(n)))?;
        }
        Ok(store)
    }
}
