//! Tags torrents with IMDB keywords.

use tracing::info;

use super::{ensure_parent_dir, open_source, source_query, JobError, JobReport};
use crate::config::{Config, TagsJobConfig};
use crate::cursor::open_cursor_store;
use crate::imdb::ImdbIndex;
use crate::ingest::Ingestor;
use crate::tags::{ImdbTagger, SqliteTagStore};

pub fn run_tags(config: &Config, job: &TagsJobConfig) -> Result<JobReport, JobError> {
    let index = ImdbIndex::load(
        &job.imdb_titles,
        &job.imdb_keywords,
        job.max_tags_per_infohash,
    )?;
    let stats = index.stats();
    info!(
        titles = index.title_count(),
        malformed_lines = stats.malformed_lines,
        dropped_keywords = stats.dropped_keywords,
        "IMDB index loaded"
    );

    let source = open_source(config)?;
    ensure_parent_dir(&job.database)?;
    let tags = SqliteTagStore::new(&job.database, &job.creator_seed, job.creator_pool)?;
    let cursor = open_cursor_store(&config.cursor, config.job.name())?;

    let ingestor = Ingestor::new(
        config.job.name(),
        source.source(source_query(config)),
        &tags,
        cursor,
    )
    .with_options(config.ingest.to_options());
    let summary = ingestor.run(&ImdbTagger::new(index))?;

    let operations = tags.operation_count()?;
    Ok(JobReport {
        summary,
        detail: Some(format!("Tag database holds {} operations", operations)),
    })
}
