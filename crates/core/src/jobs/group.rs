//! Groups matching torrent names into a title tree.

use super::{open_source, source_query, JobError, JobReport};
use crate::config::{Config, GroupJobConfig};
use crate::cursor::MemoryCursorStore;
use crate::grouping::{group_name, TitleTreeSink};
use crate::ingest::Ingestor;

/// One-shot grouping run; the cursor is never persisted.
pub fn run_group(config: &Config, job: &GroupJobConfig) -> Result<JobReport, JobError> {
    let source = open_source(config)?;
    let query = source_query(config).with_title_contains(job.query.trim());

    let ingestor = Ingestor::new(
        config.job.name(),
        source.source(query),
        TitleTreeSink::new(),
        MemoryCursorStore::new(),
    )
    .with_options(config.ingest.to_options());
    let summary = ingestor.run(&group_name)?;

    let tree = ingestor.into_sink().into_tree();
    let detail = if tree.is_empty() {
        format!("No torrents match {:?}", job.query)
    } else {
        tree.render()
    };
    Ok(JobReport {
        summary,
        detail: Some(detail),
    })
}
