//! Durable cursor stores.

mod file;
mod memory;
mod sqlite;

pub use file::FileCursorStore;
pub use memory::MemoryCursorStore;
pub use sqlite::SqliteCursorStore;

use std::path::{Path, PathBuf};

use crate::config::{CursorBackend, CursorConfig};
use crate::ingest::{CursorError, CursorStore};

/// Build the cursor store selected in the configuration.
///
/// `job` is used as the cursor name when the config does not set one. The
/// file backend keeps one file per name next to the configured path, so
/// `data/current_rowid.txt` becomes `data/current_rowid.merge.txt`.
pub fn open_cursor_store(
    config: &CursorConfig,
    job: &str,
) -> Result<Box<dyn CursorStore>, CursorError> {
    let name = config.name.as_deref().unwrap_or(job);
    let store: Box<dyn CursorStore> = match config.backend {
        CursorBackend::File => Box::new(FileCursorStore::new(named_file(&config.path, name))),
        CursorBackend::Sqlite => Box::new(SqliteCursorStore::new(&config.path, name)?),
        CursorBackend::Memory => Box::new(MemoryCursorStore::new()),
    };
    Ok(store)
}

/// Insert `name` before the extension of `path`.
pub fn named_file(path: &Path, name: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cursor".to_string());
    let file_name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, name, ext.to_string_lossy()),
        None => format!("{}.{}", stem, name),
    };
    path.with_file_name(file_name)
}
