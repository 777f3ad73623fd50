//! Copies torrents missing from a target metadata database.

use tracing::info;

use super::{ensure_parent_dir, open_source, source_query, JobError, JobReport};
use crate::config::{Config, MergeJobConfig};
use crate::cursor::open_cursor_store;
use crate::ingest::{Ingestor, TransformError};
use crate::metadata::{is_valid_infohash, SqliteMetadataStore, TorrentMetadata};

/// Prepare a source row for the target database.
///
/// The row id and health counts only mean something in the source database
/// and are dropped.
pub fn merge_transform(
    torrent: &TorrentMetadata,
) -> Result<Option<TorrentMetadata>, TransformError> {
    if !is_valid_infohash(&torrent.infohash) {
        return Err(TransformError::new(format!(
            "invalid infohash {:?}",
            torrent.infohash
        )));
    }
    Ok(Some(torrent.portable()))
}

pub fn run_merge(config: &Config, job: &MergeJobConfig) -> Result<JobReport, JobError> {
    let source = open_source(config)?;
    ensure_parent_dir(&job.target)?;
    let target = SqliteMetadataStore::new(&job.target)?;
    let cursor = open_cursor_store(&config.cursor, config.job.name())?;

    info!(
        source = %config.source.path.display(),
        target = %job.target.display(),
        "Merging metadata"
    );

    let ingestor = Ingestor::new(
        config.job.name(),
        source.source(source_query(config)),
        &target,
        cursor,
    )
    .with_options(config.ingest.to_options());
    let summary = ingestor.run(&merge_transform)?;

    let total = target.count(&source_query(config))?;
    Ok(JobReport {
        summary,
        detail: Some(format!("Target now holds {} torrents", total)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_drops_local_fields() {
        let mut torrent = TorrentMetadata::new("a".repeat(40), "Debian 12", 650);
        torrent.rowid = Some(17);
        torrent.seeders = 40;
        torrent.leechers = 3;

        let merged = merge_transform(&torrent).unwrap().unwrap();
        assert_eq!(merged.rowid, None);
        assert_eq!(merged.seeders, 0);
        assert_eq!(merged.leechers, 0);
        assert_eq!(merged.title, "Debian 12");
    }

    #[test]
    fn test_transform_rejects_invalid_infohash() {
        let torrent = TorrentMetadata::new("not-a-hash", "Broken", 1);
        assert!(merge_transform(&torrent).is_err());
    }
}
