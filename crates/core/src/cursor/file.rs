//! Cursor persisted as a decimal number in a text file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ingest::{CursorError, CursorStore};

/// Cursor stored in a plain text file.
///
/// Writes go to a sibling temp file which is synced and renamed over the
/// target, so a crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cursor".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> Result<u64, CursorError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cursor file, starting at 0");
                return Ok(0);
            }
            Err(e) => return Err(CursorError::Io(e)),
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        // Cursors are SQLite offsets, so they must fit in an i64
        trimmed
            .parse::<i64>()
            .ok()
            .and_then(|value| u64::try_from(value).ok())
            .ok_or_else(|| CursorError::Corrupt {
                value: trimmed.to_string(),
            })
    }

    fn save(&self, cursor: u64) -> Result<(), CursorError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            write!(file, "{}", cursor)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(dir.path().join("current_rowid.txt"));
        assert_eq!(store.load().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(dir.path().join("current_rowid.txt"));

        store.save(4200).unwrap();
        assert_eq!(store.load().unwrap(), 4200);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "4200");

        store.save(4300).unwrap();
        assert_eq!(FileCursorStore::new(store.path()).load().unwrap(), 4300);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(dir.path().join("cursor.txt"));
        store.save(1).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["cursor.txt".to_string()]);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(dir.path().join("data").join("nested").join("c.txt"));
        store.save(7).unwrap();
        assert_eq!(store.load().unwrap(), 7);
    }

    #[test]
    fn test_trailing_newline_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursor.txt");
        fs::write(&path, "300\n").unwrap();
        assert_eq!(FileCursorStore::new(&path).load().unwrap(), 300);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursor.txt");
        fs::write(&path, "three hundred").unwrap();

        let err = FileCursorStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CursorError::Corrupt { .. }));
    }

    #[test]
    fn test_value_beyond_i64_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cursor.txt");
        fs::write(&path, (i64::MAX as u64 + 1).to_string()).unwrap();
        assert!(matches!(
            FileCursorStore::new(&path).load().unwrap_err(),
            CursorError::Corrupt { .. }
        ));

        fs::write(&path, "-5").unwrap();
        assert!(FileCursorStore::new(&path).load().is_err());

        fs::write(&path, i64::MAX.to_string()).unwrap();
        assert_eq!(FileCursorStore::new(&path).load().unwrap(), i64::MAX as u64);
    }
}
