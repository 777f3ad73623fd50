//! Derives tags for torrents from IMDB keywords.

use crate::imdb::ImdbIndex;
use crate::ingest::{Transform, TransformError};
use crate::metadata::{is_valid_infohash, TorrentMetadata};
use crate::title::parse_name;

use super::TagBatch;

/// Tags a torrent with the IMDB keywords of the title parsed from its name.
pub struct ImdbTagger {
    index: ImdbIndex,
}

impl ImdbTagger {
    pub fn new(index: ImdbIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ImdbIndex {
        &self.index
    }
}

impl Transform<TorrentMetadata, TagBatch> for ImdbTagger {
    fn apply(&self, torrent: &TorrentMetadata) -> Result<Option<TagBatch>, TransformError> {
        if !is_valid_infohash(&torrent.infohash) {
            return Err(TransformError::new(format!(
                "invalid infohash {:?}",
                torrent.infohash
            )));
        }

        let Some(title) = parse_name(&torrent.title).title else {
            return Ok(None);
        };

        let mut tags: Vec<String> = Vec::new();
        for keyword in self.index.keywords_for_title(&title) {
            if !tags.contains(keyword) {
                tags.push(keyword.clone());
            }
        }
        if tags.is_empty() {
            return Ok(None);
        }

        Ok(Some(TagBatch {
            infohash: torrent.infohash.to_lowercase(),
            tags,
        }))
    }
}
