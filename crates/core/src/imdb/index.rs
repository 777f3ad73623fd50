use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::title::normalize_title;

/// Lines between progress log messages while loading.
const PROGRESS_LINES: u64 = 1_000_000;

/// Errors that can occur while loading IMDB data.
#[derive(Debug, Error)]
pub enum ImdbError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters gathered while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImdbStats {
    pub title_lines: u64,
    pub keyword_lines: u64,
    /// Lines with too few columns.
    pub malformed_lines: u64,
    /// Keywords dropped because their title already had the maximum.
    pub dropped_keywords: u64,
}

/// Maps normalized titles to IMDB ids and IMDB ids to keywords.
#[derive(Debug, Default)]
pub struct ImdbIndex {
    title_to_id: HashMap<String, String>,
    keywords: HashMap<String, Vec<String>>,
    max_keywords: usize,
    stats: ImdbStats,
}

impl ImdbIndex {
    /// Load the titles TSV and the keywords CSV from disk.
    pub fn load(
        titles_path: &Path,
        keywords_path: &Path,
        max_keywords: usize,
    ) -> Result<Self, ImdbError> {
        let open = |path: &Path| {
            File::open(path)
                .map(BufReader::new)
                .map_err(|source| ImdbError::Open {
                    path: path.to_path_buf(),
                    source,
                })
        };
        Self::from_readers(open(titles_path)?, open(keywords_path)?, max_keywords)
    }

    /// Build the index from readers over the titles TSV and keywords CSV.
    pub fn from_readers(
        titles: impl BufRead,
        keywords: impl BufRead,
        max_keywords: usize,
    ) -> Result<Self, ImdbError> {
        let mut index = Self {
            max_keywords,
            ..Self::default()
        };
        index.read_keywords(keywords)?;
        index.read_titles(titles)?;
        info!(
            titles = index.title_to_id.len(),
            tagged_ids = index.keywords.len(),
            malformed = index.stats.malformed_lines,
            "IMDB index loaded"
        );
        Ok(index)
    }

    fn read_keywords(&mut self, reader: impl BufRead) -> Result<(), ImdbError> {
        for line in reader.lines() {
            let line = line?;
            self.stats.keyword_lines += 1;
            if self.stats.keyword_lines % PROGRESS_LINES == 0 {
                info!("Parsed {} lines with IMDB keywords", self.stats.keyword_lines);
            }

            let Some((imdb_id, keyword)) = line.trim().split_once(',') else {
                self.stats.malformed_lines += 1;
                continue;
            };
            let keyword = keyword.trim();
            if imdb_id.is_empty() || keyword.is_empty() {
                self.stats.malformed_lines += 1;
                continue;
            }

            let entry = self.keywords.entry(imdb_id.to_string()).or_default();
            if entry.len() >= self.max_keywords {
                self.stats.dropped_keywords += 1;
                continue;
            }
            entry.push(keyword.replace(' ', "-"));
        }
        Ok(())
    }

    fn read_titles(&mut self, reader: impl BufRead) -> Result<(), ImdbError> {
        // First line is the TSV header
        for line in reader.lines().skip(1) {
            let line = line?;
            self.stats.title_lines += 1;
            if self.stats.title_lines % PROGRESS_LINES == 0 {
                info!("Parsed {} lines with IMDB titles", self.stats.title_lines);
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 4 {
                debug!(line = self.stats.title_lines, "Malformed IMDB title line");
                self.stats.malformed_lines += 1;
                continue;
            }

            let imdb_id = parts[0];
            for title in [parts[2], parts[3]] {
                let key = normalize_title(title);
                if !key.is_empty() {
                    self.title_to_id
                        .entry(key)
                        .or_insert_with(|| imdb_id.to_string());
                }
            }
        }
        Ok(())
    }

    /// IMDB id for a title, matched on its normalized form.
    pub fn imdb_id(&self, title: &str) -> Option<&str> {
        self.title_to_id
            .get(&normalize_title(title))
            .map(String::as_str)
    }

    /// Keywords of an IMDB id.
    pub fn keywords(&self, imdb_id: &str) -> &[String] {
        self.keywords
            .get(imdb_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keywords for a title, empty when the title is unknown.
    pub fn keywords_for_title(&self, title: &str) -> &[String] {
        self.imdb_id(title)
            .map(|id| self.keywords(id))
            .unwrap_or(&[])
    }

    pub fn title_count(&self) -> usize {
        self.title_to_id.len()
    }

    pub fn max_keywords(&self) -> usize {
        self.max_keywords
    }

    pub fn stats(&self) -> &ImdbStats {
        &self.stats
    }
}
