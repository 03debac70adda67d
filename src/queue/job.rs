//! Encoding job definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix appended to encoded file stems. Files carrying it are never re-enqueued.
pub const ENCODED_SUFFIX: &str = "_encoded";

/// Represents an encoding job in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// Unique identifier for this job.
    pub id: String,

    /// Path to the source file.
    pub input_path: PathBuf,

    /// Path for the encoded output.
    pub output_path: PathBuf,

    /// Name of the preset that drives track selection and the HandBrake preset.
    pub preset_name: String,

    /// Current status of the job.
    pub status: JobStatus,

    /// Number of encoding attempts made.
    pub attempt_count: u32,

    /// Timestamp when the job was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the job was last updated.
    pub updated_at: DateTime<Utc>,

    /// Timestamp when encoding started (if applicable).
    pub started_at: Option<DateTime<Utc>>,

    /// Timestamp when encoding completed (if applicable).
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message if the job failed or went to manual review.
    pub error_message: Option<String>,

    /// Encoding progress percentage (0-100).
    pub progress: Option<f32>,

    /// Metadata about the encode result.
    pub result_metadata: Option<EncodeResultMetadata>,
}

impl EncodeJob {
    /// Creates a new encoding job with the given parameters.
    pub fn new(input_path: PathBuf, output_path: PathBuf, preset_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            input_path,
            output_path,
            preset_name,
            status: JobStatus::Pending,
            attempt_count: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
            progress: None,
            result_metadata: None,
        }
    }

    /// Creates a job writing to the conventional output name inside `output_dir`.
    pub fn for_file(input_path: PathBuf, output_dir: &Path, preset_name: String) -> Self {
        let output_path = encoded_output_path(&input_path, output_dir);
        Self::new(input_path, output_path, preset_name)
    }

    /// Marks the job as in progress.
    pub fn start(&mut self) {
        self.status = JobStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self.attempt_count += 1;
    }

    /// Marks the job as completed successfully.
    pub fn complete(&mut self, metadata: EncodeResultMetadata) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self.progress = Some(100.0);
        self.result_metadata = Some(metadata);
    }

    /// Marks the job as failed.
    pub fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
        self.error_message = Some(error);
    }

    /// Puts the job back into the pending state.
    pub fn retry(&mut self) {
        self.status = JobStatus::Pending;
        self.updated_at = Utc::now();
        self.error_message = None;
        self.progress = None;
    }

    /// Marks the job as routed to the manual-review list.
    pub fn manual_review(&mut self, reason: String) {
        self.status = JobStatus::ManualReview;
        self.updated_at = Utc::now();
        self.error_message = Some(reason);
    }

    /// Marks the job as stopped by shutdown before it finished.
    pub fn interrupt(&mut self) {
        self.status = JobStatus::Interrupted;
        self.updated_at = Utc::now();
        self.progress = None;
    }

    /// Updates the progress of the job.
    pub fn update_progress(&mut self, progress: f32) {
        self.progress = Some(progress.clamp(0.0, 100.0));
        self.updated_at = Utc::now();
    }

    /// File name of the input, for logs and notifications.
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }
}

/// Status of an encoding job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting to be processed.
    Pending,
    /// Job is currently being encoded.
    InProgress,
    /// Job completed successfully.
    Completed,
    /// Track selection or scanning refused the file.
    ManualReview,
    /// HandBrake failed.
    Failed,
    /// Shutdown stopped the encode; resumable.
    Interrupted,
}

/// Metadata about a completed encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeResultMetadata {
    /// Original file size in bytes.
    pub input_size: u64,

    /// Encoded file size in bytes.
    pub output_size: u64,

    /// Encoding duration in seconds.
    pub encode_duration_secs: f64,
}

impl EncodeResultMetadata {
    /// Calculates the compression ratio (input_size / output_size).
    pub fn compression_ratio(&self) -> f64 {
        if self.output_size == 0 {
            0.0
        } else {
            self.input_size as f64 / self.output_size as f64
        }
    }

    /// Calculates the size reduction percentage.
    pub fn size_reduction_percent(&self) -> f64 {
        if self.input_size == 0 {
            0.0
        } else {
            (1.0 - (self.output_size as f64 / self.input_size as f64)) * 100.0
        }
    }

    /// Output size in megabytes.
    pub fn output_size_mb(&self) -> f64 {
        self.output_size as f64 / (1024.0 * 1024.0)
    }
}

/// `<output_dir>/<stem>_encoded.mkv`
pub fn encoded_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output_dir.join(format!("{}{}.mkv", stem, ENCODED_SUFFIX))
}

/// Returns true if the file name marks a pipeline output.
pub fn is_encoded_output(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().contains(ENCODED_SUFFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_updates_status_and_attempts() {
        let mut job = EncodeJob::new(
            PathBuf::from("/in/movie.mkv"),
            PathBuf::from("/out/movie_encoded.mkv"),
            "Films".to_string(),
        );
        assert_eq!(job.status, JobStatus::Pending);

        job.start();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.attempt_count, 1);

        job.update_progress(140.0);
        assert_eq!(job.progress, Some(100.0));

        job.interrupt();
        assert_eq!(job.status, JobStatus::Interrupted);
        assert_eq!(job.progress, None);

        job.retry();
        job.start();
        assert_eq!(job.attempt_count, 2);

        job.manual_review("no audio track available".to_string());
        assert_eq!(job.status, JobStatus::ManualReview);
        assert_eq!(job.error_message.as_deref(), Some("no audio track available"));
    }

    #[test]
    fn output_name_uses_encoded_suffix() {
        let output = encoded_output_path(Path::new("/in/Show S01E01.mp4"), Path::new("/out"));
        assert_eq!(output, PathBuf::from("/out/Show S01E01_encoded.mkv"));
        assert!(is_encoded_output(&output));
        assert!(!is_encoded_output(Path::new("/in/Show S01E01.mp4")));
    }

    #[test]
    fn job_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::ManualReview).unwrap();
        assert_eq!(json, "\"manual_review\"");
    }

    #[test]
    fn size_reduction() {
        let metadata = EncodeResultMetadata {
            input_size: 4_000,
            output_size: 1_000,
            encode_duration_secs: 10.0,
        };
        assert!((metadata.compression_ratio() - 4.0).abs() < f64::EPSILON);
        assert!((metadata.size_reduction_percent() - 75.0).abs() < 1e-9);
    }
}
