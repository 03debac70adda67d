//! Interrupted-queue persistence for `run --resume`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::job::EncodeJob;
use crate::error::QueueError;

/// Snapshot of the pipeline taken at shutdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    pub saved_at: DateTime<Utc>,
    /// Job that was encoding when shutdown arrived.
    pub current: Option<EncodeJob>,
    /// Jobs still waiting, in queue order.
    pub pending: Vec<EncodeJob>,
}

impl QueueState {
    pub fn new(current: Option<EncodeJob>, pending: Vec<EncodeJob>) -> Self {
        Self {
            saved_at: Utc::now(),
            current,
            pending,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Jobs to re-enqueue, interrupted one first, all reset to pending.
    pub fn into_resumable_jobs(self) -> Vec<EncodeJob> {
        self.current
            .into_iter()
            .chain(self.pending)
            .map(|mut job| {
                job.retry();
                job
            })
            .collect()
    }
}

/// JSON state file holding a [`QueueState`].
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the snapshot. An empty snapshot removes the file instead.
    pub fn save(&self, state: &QueueState) -> Result<(), QueueError> {
        if state.is_empty() {
            return self.clear();
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QueueError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| QueueError::SerializationFailed(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| QueueError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        info!(
            path = %self.path.display(),
            interrupted = state.current.is_some(),
            pending = state.pending.len(),
            "Saved queue state"
        );
        Ok(())
    }

    /// Reads the snapshot, if one exists and is readable.
    pub fn load(&self) -> Result<Option<QueueState>, QueueError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| QueueError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable queue state");
                Ok(None)
            }
        }
    }

    /// Deletes the state file if present.
    pub fn clear(&self) -> Result<(), QueueError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::WriteFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::JobStatus;
    use tempfile::TempDir;

    fn job(name: &str) -> EncodeJob {
        EncodeJob::for_file(
            PathBuf::from(format!("/in/{}", name)),
            Path::new("/out"),
            "Films".to_string(),
        )
    }

    #[test]
    fn round_trips_interrupted_queue() {
        let dir = TempDir::new().unwrap();
        let file = StateFile::new(dir.path().join("state/queue.json"));

        let mut current = job("current.mkv");
        current.start();
        current.interrupt();
        file.save(&QueueState::new(Some(current), vec![job("next.mkv")])).unwrap();

        let state = file.load().unwrap().unwrap();
        let jobs = state.into_resumable_jobs();
        let names: Vec<String> = jobs.iter().map(|j| j.file_name()).collect();
        assert_eq!(names, vec!["current.mkv", "next.mkv"]);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Pending));
    }

    #[test]
    fn empty_state_removes_file() {
        let dir = TempDir::new().unwrap();
        let file = StateFile::new(dir.path().join("queue.json"));
        file.save(&QueueState::new(None, vec![job("a.mkv")])).unwrap();
        assert!(file.path().exists());

        file.save(&QueueState::new(None, vec![])).unwrap();
        assert!(!file.path().exists());
        assert!(file.load().unwrap().is_none());
    }
}
