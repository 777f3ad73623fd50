//! Concrete jobs built on the ingestor.
//!
//! Each job opens its collaborators from the [`Config`], runs an
//! [`Ingestor`](crate::ingest::Ingestor) and returns a [`JobReport`].

mod group;
mod merge;
mod survey;
mod tags;

pub use group::run_group;
pub use merge::{merge_transform, run_merge};
pub use survey::{run_survey, survey_name, SurveyEntry, SurveyReport};
pub use tags::run_tags;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::{Config, JobConfig};
use crate::imdb::ImdbError;
use crate::ingest::{CursorError, IngestAborted, RunSummary};
use crate::metadata::{MetadataError, MetadataQuery, SqliteMetadataStore};
use crate::tags::TagStoreError;

/// Outcome of a finished job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub summary: RunSummary,
    /// Job-specific human readable result.
    pub detail: Option<String>,
}

/// Errors that can stop a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Source database not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Metadata store error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Tag store error: {0}")]
    TagStore(#[from] TagStoreError),

    #[error("IMDB data error: {0}")]
    Imdb(#[from] ImdbError),

    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Ingest(#[from] IngestAborted),
}

impl JobError {
    /// Counts gathered before the run aborted, if it got that far.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            JobError::Ingest(aborted) => Some(&aborted.summary),
            _ => None,
        }
    }
}

/// Run the job selected in the configuration.
pub fn run_job(config: &Config) -> Result<JobReport, JobError> {
    match &config.job {
        JobConfig::Merge(job) => run_merge(config, job),
        JobConfig::Tags(job) => run_tags(config, job),
        JobConfig::Survey(job) => run_survey(config, job),
        JobConfig::Group(job) => run_group(config, job),
    }
}

/// Open the configured source database; it must already exist.
fn open_source(config: &Config) -> Result<SqliteMetadataStore, JobError> {
    if !config.source.path.exists() {
        return Err(JobError::SourceNotFound(config.source.path.clone()));
    }
    Ok(SqliteMetadataStore::new(&config.source.path)?)
}

fn source_query(config: &Config) -> MetadataQuery {
    MetadataQuery::default().with_metadata_type(config.source.metadata_type)
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
