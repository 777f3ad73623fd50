use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ingest::IngestOptions;
use crate::metadata::REGULAR_TORRENT;
use crate::tags::DEFAULT_CREATOR_POOL;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub job: JobConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Batch loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Stop after this many rows (default: run until the source is exhausted)
    #[serde(default)]
    pub max_rows: Option<u64>,
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_rows: None,
            progress_every: default_progress_every(),
        }
    }
}

impl IngestConfig {
    pub fn to_options(&self) -> IngestOptions {
        IngestOptions {
            batch_size: self.batch_size,
            max_rows: self.max_rows,
            progress_every: self.progress_every,
        }
    }
}

fn default_batch_size() -> u64 {
    100
}

fn default_progress_every() -> u64 {
    1000
}

/// Cursor persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CursorConfig {
    #[serde(default)]
    pub backend: CursorBackend,
    /// Cursor file (file backend) or database (sqlite backend)
    #[serde(default = "default_cursor_path")]
    pub path: PathBuf,
    /// Cursor name (default: job kind); the file backend adds it to the file name
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            backend: CursorBackend::default(),
            path: default_cursor_path(),
            name: None,
        }
    }
}

fn default_cursor_path() -> PathBuf {
    PathBuf::from("data/current_rowid.txt")
}

/// Available cursor backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CursorBackend {
    #[default]
    File,
    Sqlite,
    /// Not persisted; every run starts from 0
    Memory,
}

/// Source metadata database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    #[serde(default = "default_metadata_type")]
    pub metadata_type: i64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            metadata_type: default_metadata_type(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("metadata.db")
}

fn default_metadata_type() -> i64 {
    REGULAR_TORRENT
}

/// Job to run, selected by `kind`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobConfig {
    /// Copy torrents missing from the target database
    Merge(MergeJobConfig),
    /// Generate tags from IMDB keywords
    Tags(TagsJobConfig),
    /// Measure how many names the title parser understands
    Survey(SurveyJobConfig),
    /// Group matching names by title, season and episode
    Group(GroupJobConfig),
}

impl JobConfig {
    /// Job name used for logs, metrics and default cursor names.
    pub fn name(&self) -> &'static str {
        match self {
            JobConfig::Merge(_) => "merge",
            JobConfig::Tags(_) => "tags",
            JobConfig::Survey(_) => "survey",
            JobConfig::Group(_) => "group",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeJobConfig {
    /// Database receiving the merged torrents
    pub target: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TagsJobConfig {
    #[serde(default = "default_tags_db")]
    pub database: PathBuf,
    #[serde(default = "default_imdb_titles")]
    pub imdb_titles: PathBuf,
    #[serde(default = "default_imdb_keywords")]
    pub imdb_keywords: PathBuf,
    #[serde(default = "default_max_tags")]
    pub max_tags_per_infohash: usize,
    /// Number of creator identities tags are attributed to
    #[serde(default = "default_creator_pool")]
    pub creator_pool: usize,
    #[serde(default = "default_creator_seed")]
    pub creator_seed: String,
}

fn default_tags_db() -> PathBuf {
    PathBuf::from("data/tags.db")
}

fn default_imdb_titles() -> PathBuf {
    PathBuf::from("data/imdb_titles.tsv")
}

fn default_imdb_keywords() -> PathBuf {
    PathBuf::from("data/imdb_keywords.csv")
}

fn default_max_tags() -> usize {
    10
}

fn default_creator_pool() -> usize {
    DEFAULT_CREATOR_POOL
}

fn default_creator_seed() -> String {
    "harvester".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurveyJobConfig {
    /// File receiving names the parser could not handle
    #[serde(default = "default_failed_titles")]
    pub failed_titles: PathBuf,
}

fn default_failed_titles() -> PathBuf {
    PathBuf::from("data/failed_titles.txt")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupJobConfig {
    /// Substring the torrent name must contain
    pub query: String,
}

/// Metrics export configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write Prometheus text format here when the run ends
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_merge_job_with_defaults() {
        let toml = r#"
[job]
kind = "merge"
target = "merged.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.job, JobConfig::Merge(ref m) if m.target.to_str() == Some("merged.db")));
        assert_eq!(config.job.name(), "merge");
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.progress_every, 1000);
        assert_eq!(config.ingest.max_rows, None);
        assert_eq!(config.cursor.backend, CursorBackend::File);
        assert_eq!(
            config.cursor.path.to_str().unwrap(),
            "data/current_rowid.txt"
        );
        assert_eq!(config.source.path.to_str().unwrap(), "metadata.db");
        assert_eq!(config.source.metadata_type, 300);
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_deserialize_tags_job_defaults() {
        let toml = r#"
[job]
kind = "tags"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let JobConfig::Tags(tags) = config.job else {
            panic!("expected tags job");
        };
        assert_eq!(tags.max_tags_per_infohash, 10);
        assert_eq!(tags.creator_pool, 1000);
        assert_eq!(tags.database.to_str().unwrap(), "data/tags.db");
        assert_eq!(tags.imdb_titles.to_str().unwrap(), "data/imdb_titles.tsv");
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[job]
kind = "survey"
failed_titles = "/tmp/failed.txt"

[ingest]
batch_size = 100
max_rows = 10000
progress_every = 500

[cursor]
backend = "sqlite"
path = "/data/cursors.db"
name = "ptn-survey"

[source]
path = "/data/metadata.db"
metadata_type = 300

[metrics]
textfile = "/var/lib/node_exporter/harvester.prom"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.job.name(), "survey");
        assert_eq!(config.ingest.max_rows, Some(10_000));
        assert_eq!(config.cursor.backend, CursorBackend::Sqlite);
        assert_eq!(config.cursor.name.as_deref(), Some("ptn-survey"));
        assert!(config.metrics.textfile.is_some());

        let options = config.ingest.to_options();
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.max_rows, Some(10_000));
        assert_eq!(options.progress_every, 500);
    }

    #[test]
    fn test_deserialize_missing_job_fails() {
        let toml = r#"
[ingest]
batch_size = 50
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_unknown_job_kind_fails() {
        let toml = r#"
[job]
kind = "crawl"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_group_job_requires_query() {
        let toml = r#"
[job]
kind = "group"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
