pub mod config;
pub mod cursor;
pub mod grouping;
pub mod imdb;
pub mod ingest;
pub mod jobs;
pub mod metadata;
pub mod metrics;
pub mod tags;
pub mod testing;
pub mod title;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, CursorBackend,
    JobConfig,
};
pub use cursor::{open_cursor_store, FileCursorStore, MemoryCursorStore, SqliteCursorStore};
pub use grouping::{group_name, GroupedName, TitleTree, TitleTreeSink};
pub use imdb::{ImdbError, ImdbIndex};
pub use ingest::{
    run, CursorError, CursorStore, IngestAborted, IngestError, IngestOptions, Ingestor, Record,
    ResultSink, RowSource, RunSummary, SinkError, SourceError, Transform, TransformError,
};
pub use jobs::{run_job, JobError, JobReport};
pub use metadata::{MetadataQuery, MetadataSource, SqliteMetadataStore, TorrentMetadata};
pub use tags::{ImdbTagger, SqliteTagStore, TagBatch};
pub use title::{parse_name, ParsedName};
