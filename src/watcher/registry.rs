//! Persistent record of files already handed to the queue.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::QueueError;

/// Watch folder → file names (relative to the folder) already enqueued.
#[derive(Debug, Default)]
pub struct ProcessedRegistry {
    path: PathBuf,
    entries: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl ProcessedRegistry {
    /// Loads the registry. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Processed-file registry is corrupt, starting empty"
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read processed-file registry");
                BTreeMap::new()
            }
        };

        Self { path, entries }
    }

    pub fn contains(&self, folder: &Path, file: &Path) -> bool {
        let Some(key) = relative_key(folder, file) else {
            return false;
        };
        self.entries.get(folder).is_some_and(|files| files.contains(&key))
    }

    /// Records a file. Returns false if it was already known.
    pub fn insert(&mut self, folder: &Path, file: &Path) -> bool {
        let Some(key) = relative_key(folder, file) else {
            return false;
        };
        self.entries.entry(folder.to_path_buf()).or_default().insert(key)
    }

    /// Forgets files that no longer exist on disk. Returns how many were dropped.
    pub fn prune_missing(&mut self) -> usize {
        let mut removed = 0;
        for (folder, files) in &mut self.entries {
            let before = files.len();
            files.retain(|name| folder.join(name).exists());
            removed += before - files.len();
        }
        self.entries.retain(|_, files| !files.is_empty());

        if removed > 0 {
            debug!(removed, "Pruned vanished files from registry");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QueueError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| QueueError::SerializationFailed(e.to_string()))?;

        std::fs::write(&self.path, json).map_err(|e| QueueError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

fn relative_key(folder: &Path, file: &Path) -> Option<String> {
    file.strip_prefix(folder)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned())
}
