//! Groups torrent names into title / season / episode buckets.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::ingest::{ResultSink, SinkError, TransformError};
use crate::metadata::TorrentMetadata;
use crate::title::{parse_name, title_case, ParsedName};

const ALL_SEASONS: &str = "All Seasons";
const ALL_EPISODES: &str = "All Episodes";

/// Episode label → names.
pub type EpisodeBuckets = BTreeMap<String, Vec<String>>;
/// Season label → episodes.
pub type SeasonBuckets = BTreeMap<String, EpisodeBuckets>;

/// A name together with what was parsed out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedName {
    pub name: String,
    pub parsed: ParsedName,
}

/// Parse a torrent row for grouping; rows without a title are skipped.
pub fn group_name(torrent: &TorrentMetadata) -> Result<Option<GroupedName>, TransformError> {
    let parsed = parse_name(&torrent.title);
    if parsed.title.is_none() {
        return Ok(None);
    }
    Ok(Some(GroupedName {
        name: torrent.title.clone(),
        parsed,
    }))
}

/// Nested title → season → episode → names map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleTree {
    titles: BTreeMap<String, SeasonBuckets>,
}

impl TitleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and insert every name; returns the tree and the names without a title.
    pub fn from_names<I, S>(names: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tree = Self::new();
        let mut skipped = Vec::new();
        for name in names {
            let name = name.into();
            let parsed = parse_name(&name);
            if !tree.insert(name.clone(), &parsed) {
                skipped.push(name);
            }
        }
        (tree, skipped)
    }

    /// Insert a parsed name. Returns `false` when it has no title.
    pub fn insert(&mut self, name: String, parsed: &ParsedName) -> bool {
        let Some(title) = parsed.title.as_deref() else {
            return false;
        };

        let season = parsed
            .season
            .map_or_else(|| ALL_SEASONS.to_string(), |s| format!("Season {}", s));
        let episode = parsed
            .episode
            .map_or_else(|| ALL_EPISODES.to_string(), |e| format!("Episode {}", e));

        self.titles
            .entry(title_case(title))
            .or_default()
            .entry(season)
            .or_default()
            .entry(episode)
            .or_default()
            .push(name);
        true
    }

    pub fn titles(&self) -> &BTreeMap<String, SeasonBuckets> {
        &self.titles
    }

    pub fn get(&self, title: &str) -> Option<&SeasonBuckets> {
        self.titles.get(title)
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Total number of names in the tree.
    pub fn name_count(&self) -> usize {
        self.titles
            .values()
            .flat_map(|seasons| seasons.values())
            .flat_map(|episodes| episodes.values())
            .map(Vec::len)
            .sum()
    }

    /// Render as an indented text tree, two spaces per level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (title, seasons) in &self.titles {
            let _ = writeln!(out, "{}", title);
            for (season, episodes) in seasons {
                let _ = writeln!(out, "  {}", season);
                for (episode, names) in episodes {
                    let _ = writeln!(out, "    {}", episode);
                    for name in names {
                        let _ = writeln!(out, "      {}", name);
                    }
                }
            }
        }
        out
    }
}

/// Sink collecting grouped names into a [`TitleTree`].
///
/// Never reports a key as existing: every matching row is shown.
#[derive(Debug, Default)]
pub struct TitleTreeSink {
    tree: Mutex<TitleTree>,
}

impl TitleTreeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected tree.
    pub fn tree(&self) -> TitleTree {
        self.tree.lock().unwrap().clone()
    }

    pub fn into_tree(self) -> TitleTree {
        self.tree.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResultSink<GroupedName> for TitleTreeSink {
    fn exists(&self, _key: &str) -> Result<bool, SinkError> {
        Ok(false)
    }

    fn write(&self, result: GroupedName) -> Result<(), SinkError> {
        self.tree
            .lock()
            .unwrap()
            .insert(result.name, &result.parsed);
        Ok(())
    }
}
