//! Manual-review list: files the pipeline refused to encode automatically.
//!
//! Stored as plain text, one `path|preset` entry per line, so it can be edited by hand.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::QueueError;

/// One line of the manual-review list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualReviewEntry {
    pub file: PathBuf,
    pub preset: Option<String>,
}

impl ManualReviewEntry {
    pub fn new(file: impl Into<PathBuf>, preset: Option<String>) -> Self {
        Self {
            file: file.into(),
            preset,
        }
    }

    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line.split_once('|') {
            Some((file, preset)) => Some(Self::new(file.trim(), Some(preset.trim().to_string()))),
            None => Some(Self::new(line, None)),
        }
    }

    fn to_line(&self) -> String {
        match &self.preset {
            Some(preset) => format!("{}|{}", self.file.display(), preset),
            None => self.file.display().to_string(),
        }
    }
}

/// File-backed manual-review list.
#[derive(Debug, Clone)]
pub struct ManualReviewList {
    path: PathBuf,
}

impl ManualReviewList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an entry unless the identical entry is already listed.
    ///
    /// Returns true if the entry was added.
    pub fn add(&self, file: &Path, preset: &str) -> Result<bool, QueueError> {
        let entry = ManualReviewEntry::new(file, Some(preset.to_string()));
        let mut entries = self.list()?;

        if entries.contains(&entry) {
            info!(file = %file.display(), "File already in manual review list");
            return Ok(false);
        }

        entries.push(entry);
        self.write(&entries)?;
        info!(file = %file.display(), preset = %preset, "Added file to manual review list");
        Ok(true)
    }

    /// Reads all entries. A missing file is an empty list.
    pub fn list(&self) -> Result<Vec<ManualReviewEntry>, QueueError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| QueueError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(content.lines().filter_map(ManualReviewEntry::parse).collect())
    }

    /// Removes every entry for `file`.
    pub fn remove(&self, file: &Path) -> Result<usize, QueueError> {
        let entries = self.list()?;
        let before = entries.len();
        let remaining: Vec<ManualReviewEntry> =
            entries.into_iter().filter(|e| e.file != file).collect();
        let removed = before - remaining.len();

        if removed == 0 {
            return Err(QueueError::EntryNotFound {
                entry: file.display().to_string(),
            });
        }

        self.write(&remaining)?;
        Ok(removed)
    }

    fn write(&self, entries: &[ManualReviewEntry]) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QueueError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content: String = entries.iter().map(|e| e.to_line() + "\n").collect();

        std::fs::write(&self.path, content).map_err(|e| QueueError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let list = ManualReviewList::new(dir.path().join("manual.txt"));

        assert!(list.add(Path::new("/in/a.mkv"), "Films").unwrap());
        assert!(!list.add(Path::new("/in/a.mkv"), "Films").unwrap());
        assert!(list.add(Path::new("/in/a.mkv"), "Mangas VO 1000kbps").unwrap());

        let content = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(content, "/in/a.mkv|Films\n/in/a.mkv|Mangas VO 1000kbps\n");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = ManualReviewList::new(dir.path().join("nested/manual.txt"));
        assert!(list.list().unwrap().is_empty());
    }

    #[test]
    fn parses_bare_file_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.txt");
        std::fs::write(&path, "movie.mkv\n\n/in/b.mkv | Films \n").unwrap();

        let entries = ManualReviewList::new(&path).list().unwrap();
        assert_eq!(
            entries,
            vec![
                ManualReviewEntry::new("movie.mkv", None),
                ManualReviewEntry::new("/in/b.mkv", Some("Films".to_string())),
            ]
        );
    }

    #[test]
    fn remove_drops_all_entries_for_file() {
        let dir = TempDir::new().unwrap();
        let list = ManualReviewList::new(dir.path().join("manual.txt"));
        list.add(Path::new("/in/a.mkv"), "Films").unwrap();
        list.add(Path::new("/in/a.mkv"), "Other").unwrap();
        list.add(Path::new("/in/b.mkv"), "Films").unwrap();

        assert_eq!(list.remove(Path::new("/in/a.mkv")).unwrap(), 2);
        assert_eq!(list.list().unwrap().len(), 1);

        let err = list.remove(Path::new("/in/a.mkv")).unwrap_err();
        assert!(matches!(err, QueueError::EntryNotFound { .. }));
    }
}
