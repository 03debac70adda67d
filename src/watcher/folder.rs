//! Individual folder watching.

use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::model::WatchFolder;
use crate::error::WatcherError;
use crate::queue::job::is_encoded_output;

/// Watches a single folder for new video files.
pub struct FolderWatcher {
    watch_path: PathBuf,
    recursive: bool,
    file_patterns: Vec<glob::Pattern>,
    preset_name: String,
    output_dir: PathBuf,
}

/// A file seen in a watch folder, with the preset and output directory it inherits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFile {
    pub path: PathBuf,
    /// Watch folder the file was found in.
    pub folder: PathBuf,
    pub preset_name: String,
    pub output_dir: PathBuf,
}

/// Keeps the OS watch alive; dropping it stops the events.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

impl FolderWatcher {
    /// Builds a watcher for one configured folder. `default_output` applies when the
    /// folder has no `output_path` of its own.
    pub fn new(folder: &WatchFolder, default_output: &Path) -> Result<Self, WatcherError> {
        let file_patterns = folder
            .file_patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| WatcherError::WatchFailed {
                path: folder.path.clone(),
                message: format!("Invalid file pattern: {}", e),
            })?;

        Ok(Self {
            watch_path: folder.path.clone(),
            recursive: folder.recursive,
            file_patterns,
            preset_name: folder.preset.clone(),
            output_dir: folder
                .output_path
                .clone()
                .unwrap_or_else(|| default_output.to_path_buf()),
        })
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    /// Starts watching. Matching files are sent on `file_tx` until the handle is dropped.
    pub fn start(&self, file_tx: mpsc::Sender<DetectedFile>) -> Result<WatchHandle, WatcherError> {
        let filter = self.clone_filter();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for detected in filter.detected_in(event) {
                        // notify calls back on its own thread.
                        if file_tx.blocking_send(detected).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Watch error"),
            },
            Config::default(),
        )?;

        let mode = if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        watcher
            .watch(&self.watch_path, mode)
            .map_err(|e| WatcherError::WatchFailed {
                path: self.watch_path.clone(),
                message: e.to_string(),
            })?;

        info!(
            path = %self.watch_path.display(),
            recursive = self.recursive,
            preset = %self.preset_name,
            "Started watching folder"
        );

        Ok(WatchHandle { _watcher: watcher })
    }

    /// Lists matching files already in the folder, in path order.
    pub fn scan_existing(&self) -> Vec<DetectedFile> {
        let walker = if self.recursive {
            walkdir::WalkDir::new(&self.watch_path)
        } else {
            walkdir::WalkDir::new(&self.watch_path).max_depth(1)
        };

        let files: Vec<DetectedFile> = walker
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.accepts(e.path()))
            .map(|e| self.detected(e.into_path()))
            .collect();

        info!(count = files.len(), path = %self.watch_path.display(), "Scanned existing files");
        files
    }

    /// True for files matching a pattern that are not pipeline outputs.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if is_encoded_output(path) {
            debug!(path = %path.display(), "Skipping encoded output");
            return false;
        }

        self.file_patterns.iter().any(|p| p.matches(filename))
    }

    fn detected(&self, path: PathBuf) -> DetectedFile {
        DetectedFile {
            path,
            folder: self.watch_path.clone(),
            preset_name: self.preset_name.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    fn clone_filter(&self) -> FolderWatcher {
        FolderWatcher {
            watch_path: self.watch_path.clone(),
            recursive: self.recursive,
            file_patterns: self.file_patterns.clone(),
            preset_name: self.preset_name.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    /// Files of interest in a filesystem event.
    fn detected_in(&self, event: Event) -> Vec<DetectedFile> {
        // Renames into the folder arrive as Modify(Name).
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return Vec::new();
        }

        event
            .paths
            .into_iter()
            .filter(|path| path.is_file() && self.accepts(path))
            .map(|path| self.detected(path))
            .collect()
    }
}
