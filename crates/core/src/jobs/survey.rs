//! Measures how many torrent names the title parser understands.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::info;

use super::{ensure_parent_dir, open_source, source_query, JobError, JobReport};
use crate::config::{Config, SurveyJobConfig};
use crate::cursor::open_cursor_store;
use crate::ingest::{Ingestor, ResultSink, SinkError, TransformError};
use crate::metadata::TorrentMetadata;
use crate::title::parse_name;

/// Parser outcome for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyEntry {
    Parsed { name: String, title: String },
    Unparsed { name: String },
}

/// Transform feeding every name to the parser.
pub fn survey_name(torrent: &TorrentMetadata) -> Result<Option<SurveyEntry>, TransformError> {
    let name = torrent.title.clone();
    let entry = match parse_name(&name).title {
        Some(title) => SurveyEntry::Parsed { name, title },
        None => SurveyEntry::Unparsed { name },
    };
    Ok(Some(entry))
}

#[derive(Debug, Default)]
struct SurveyState {
    parsed: u64,
    unparsed: u64,
    titles: BTreeSet<String>,
}

/// Failed-titles file and the names it already holds.
#[derive(Debug)]
struct FailedTitles {
    file: File,
    written: HashSet<String>,
}

/// Sink tallying parser results.
///
/// Names without a title are appended to the failed-titles file when one is
/// configured, each name at most once, including names left there by an
/// earlier interrupted run. Never reports a key as existing, so counts cover
/// every row seen by this run, re-processed rows included.
#[derive(Debug, Default)]
pub struct SurveyReport {
    state: Mutex<SurveyState>,
    failed: Option<Mutex<FailedTitles>>,
}

impl SurveyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unparsed names to `path`, creating it if needed.
    pub fn with_failed_titles(path: &Path) -> io::Result<Self> {
        ensure_parent_dir(path)?;
        let written = match fs::read_to_string(path) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e),
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            state: Mutex::default(),
            failed: Some(Mutex::new(FailedTitles { file, written })),
        })
    }

    pub fn parsed(&self) -> u64 {
        self.state.lock().unwrap().parsed
    }

    pub fn unparsed(&self) -> u64 {
        self.state.lock().unwrap().unparsed
    }

    /// Distinct titles seen, sorted.
    pub fn titles(&self) -> Vec<String> {
        self.state.lock().unwrap().titles.iter().cloned().collect()
    }

    /// Share of names that produced a title, 0.0 when nothing was seen.
    pub fn success_ratio(&self) -> f64 {
        let state = self.state.lock().unwrap();
        let total = state.parsed + state.unparsed;
        if total == 0 {
            return 0.0;
        }
        state.parsed as f64 / total as f64
    }

    pub fn render(&self) -> String {
        let state = self.state.lock().unwrap();
        let total = state.parsed + state.unparsed;
        let ratio = if total == 0 {
            0.0
        } else {
            state.parsed as f64 / total as f64
        };
        format!(
            "Parsed {} of {} names ({:.2}%), {} failed, {} distinct titles",
            state.parsed,
            total,
            ratio * 100.0,
            state.unparsed,
            state.titles.len()
        )
    }
}

impl ResultSink<SurveyEntry> for SurveyReport {
    fn exists(&self, _key: &str) -> Result<bool, SinkError> {
        Ok(false)
    }

    fn write(&self, result: SurveyEntry) -> Result<(), SinkError> {
        match result {
            SurveyEntry::Parsed { title, .. } => {
                let mut state = self.state.lock().unwrap();
                state.parsed += 1;
                state.titles.insert(title);
            }
            SurveyEntry::Unparsed { name } => {
                if let Some(failed) = &self.failed {
                    let mut failed = failed.lock().unwrap();
                    if !failed.written.contains(&name) {
                        writeln!(failed.file, "{}", name)
                            .map_err(|e| SinkError::Write(e.to_string()))?;
                        failed.written.insert(name);
                    }
                }
                self.state.lock().unwrap().unparsed += 1;
            }
        }
        Ok(())
    }
}

pub fn run_survey(config: &Config, job: &SurveyJobConfig) -> Result<JobReport, JobError> {
    let source = open_source(config)?;
    let report = SurveyReport::with_failed_titles(&job.failed_titles)?;
    let cursor = open_cursor_store(&config.cursor, config.job.name())?;

    let ingestor = Ingestor::new(
        config.job.name(),
        source.source(source_query(config)),
        report,
        cursor,
    )
    .with_options(config.ingest.to_options());
    let summary = ingestor.run(&survey_name)?;

    let report = ingestor.into_sink();
    info!(
        parsed = report.parsed(),
        unparsed = report.unparsed(),
        failed_titles = %job.failed_titles.display(),
        "Survey finished"
    );
    Ok(JobReport {
        summary,
        detail: Some(report.render()),
    })
}
