//! File size stability detection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::folder::DetectedFile;

/// Holds detected files until their size stops changing.
pub struct StabilityChecker {
    stability_duration: Duration,
    poll_interval: Duration,
    tracked_files: HashMap<PathBuf, TrackedFile>,
}

struct TrackedFile {
    detected: DetectedFile,
    last_size: u64,
    /// When the size last stopped changing; `None` while it is still growing.
    stable_since: Option<Instant>,
}

impl StabilityChecker {
    pub fn new(stability_duration: Duration, poll_interval: Duration) -> Self {
        Self {
            stability_duration,
            poll_interval,
            tracked_files: HashMap::new(),
        }
    }

    /// Starts tracking a file. Repeated events for a tracked file are ignored.
    pub fn track(&mut self, detected: DetectedFile) {
        if self.tracked_files.contains_key(&detected.path) {
            debug!(path = %detected.path.display(), "File already being tracked");
            return;
        }

        let size = std::fs::metadata(&detected.path).map(|m| m.len()).unwrap_or(0);
        info!(path = %detected.path.display(), size, "Waiting for file to be fully written");

        self.tracked_files.insert(
            detected.path.clone(),
            TrackedFile {
                detected,
                last_size: size,
                stable_since: None,
            },
        );
    }

    pub fn untrack(&mut self, path: &Path) {
        self.tracked_files.remove(path);
    }

    /// Returns files whose size has been stable long enough and stops tracking them.
    pub fn check_all(&mut self) -> Vec<DetectedFile> {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> Vec<DetectedFile> {
        let mut ready = Vec::new();
        let mut vanished = Vec::new();

        for (path, tracked) in &mut self.tracked_files {
            let current_size = match std::fs::metadata(path) {
                Ok(m) => m.len(),
                Err(_) => {
                    vanished.push(path.clone());
                    continue;
                }
            };

            if current_size == 0 || current_size != tracked.last_size {
                if tracked.stable_since.is_some() {
                    debug!(
                        path = %path.display(),
                        old_size = tracked.last_size,
                        new_size = current_size,
                        "File size changed"
                    );
                }
                tracked.last_size = current_size;
                tracked.stable_since = None;
                continue;
            }

            let since = *tracked.stable_since.get_or_insert(now);
            if now.duration_since(since) >= self.stability_duration {
                info!(
                    path = %path.display(),
                    size = current_size,
                    "File is ready (stable for {:?})",
                    self.stability_duration
                );
                ready.push(path.clone());
            }
        }

        for path in vanished {
            debug!(path = %path.display(), "Tracked file disappeared");
            self.tracked_files.remove(&path);
        }

        let mut files: Vec<DetectedFile> = ready
            .into_iter()
            .filter_map(|path| self.tracked_files.remove(&path))
            .map(|tracked| tracked.detected)
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the number of files currently being tracked.
    pub fn tracked_count(&self) -> usize {
        self.tracked_files.len()
    }
}
