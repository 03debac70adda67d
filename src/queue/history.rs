//! Encode history: a JSON log of successful encodes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::job::EncodeJob;
use crate::error::QueueError;

/// One successful encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub file_path: PathBuf,
    pub preset: String,
    /// Output size in MB, two decimals.
    pub file_size_mb: f64,
    #[serde(default)]
    pub encode_duration_secs: f64,
}

impl HistoryRecord {
    /// Builds a record from a completed job.
    pub fn from_job(job: &EncodeJob) -> Self {
        let (size_mb, duration) = job
            .result_metadata
            .as_ref()
            .map(|m| (m.output_size_mb(), m.encode_duration_secs))
            .unwrap_or((0.0, 0.0));

        Self {
            timestamp: job.completed_at.unwrap_or_else(Utc::now),
            filename: job
                .output_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: job.output_path.clone(),
            preset: job.preset_name.clone(),
            file_size_mb: (size_mb * 100.0).round() / 100.0,
            encode_duration_secs: duration,
        }
    }
}

/// File-backed encode history.
#[derive(Debug, Clone)]
pub struct EncodeHistory {
    path: PathBuf,
}

impl EncodeHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record.
    pub fn record(&self, record: HistoryRecord) -> Result<(), QueueError> {
        let mut records = self.load()?;
        info!(
            file = %record.filename,
            size_mb = record.file_size_mb,
            "Recorded successful encode"
        );
        records.push(record);
        self.save(&records)
    }

    /// Reads every record in file order. A missing or corrupt file is an empty history.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, QueueError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| QueueError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        match serde_json::from_str(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable encode history"
                );
                Ok(Vec::new())
            }
        }
    }

    /// The `limit` most recent records, newest first.
    pub fn latest(&self, limit: usize) -> Result<Vec<HistoryRecord>, QueueError> {
        let mut records = self.load()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    /// Records newer than `hours`, newest first.
    pub fn recent(&self, hours: i64) -> Result<Vec<HistoryRecord>, QueueError> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let mut records: Vec<HistoryRecord> = self
            .load()?
            .into_iter()
            .filter(|r| r.timestamp >= cutoff)
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QueueError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| QueueError::SerializationFailed(e.to_string()))?;

        std::fs::write(&self.path, json).map_err(|e| QueueError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::EncodeResultMetadata;
    use tempfile::TempDir;

    fn record(name: &str, age_hours: i64) -> HistoryRecord {
        HistoryRecord {
            timestamp: Utc::now() - Duration::hours(age_hours),
            filename: name.to_string(),
            file_path: PathBuf::from(format!("/out/{}", name)),
            preset: "Films".to_string(),
            file_size_mb: 700.0,
            encode_duration_secs: 1200.0,
        }
    }

    #[test]
    fn latest_returns_newest_first() {
        let dir = TempDir::new().unwrap();
        let history = EncodeHistory::new(dir.path().join("history.json"));
        history.record(record("old.mkv", 100)).unwrap();
        history.record(record("new.mkv", 1)).unwrap();
        history.record(record("mid.mkv", 10)).unwrap();

        let latest: Vec<String> = history
            .latest(2)
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(latest, vec!["new.mkv", "mid.mkv"]);

        let recent = history.recent(72).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(EncodeHistory::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn record_from_completed_job() {
        let mut job = EncodeJob::new(
            PathBuf::from("/in/movie.mkv"),
            PathBuf::from("/out/movie_encoded.mkv"),
            "Films".to_string(),
        );
        job.start();
        job.complete(EncodeResultMetadata {
            input_size: 4 * 1024 * 1024 * 1024,
            output_size: 3 * 1024 * 1024 / 2,
            encode_duration_secs: 42.0,
        });

        let record = HistoryRecord::from_job(&job);
        assert_eq!(record.filename, "movie_encoded.mkv");
        assert_eq!(record.file_size_mb, 1.5);
        assert_eq!(record.preset, "Films");
    }
}
