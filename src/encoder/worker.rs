//! Serial encode worker: scan, select tracks, run HandBrakeCLI, record the outcome.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use super::handbrake::{self, EncodeRequest};
use crate::config::model::{GlobalConfig, HandBrakeConfig};
use crate::error::EncoderError;
use crate::media::{select_tracks, TrackScanner};
use crate::notify::DiscordNotifier;
use crate::presets::PresetTable;
use crate::queue::job::{EncodeJob, EncodeResultMetadata};
use crate::queue::{
    EncodeHistory, HistoryRecord, ManualReviewList, QueueState, StateFile, WorkQueue,
};

/// What happened to a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// HandBrakeCLI produced the output file.
    Encoded,
    /// Scan or track selection refused the file; it is on the manual-review list.
    ManualReview(String),
    /// HandBrakeCLI failed, or the preset disappeared from the table.
    Failed(String),
    /// Shutdown stopped the encode.
    Interrupted,
    /// Dry run: the command that would have been executed.
    DryRun(String),
}

/// Pulls jobs from the [`WorkQueue`] one at a time.
pub struct EncodeWorker {
    queue: WorkQueue,
    presets: Arc<PresetTable>,
    scanner: Arc<dyn TrackScanner>,
    handbrake: HandBrakeConfig,
    manual_review: ManualReviewList,
    history: EncodeHistory,
    state: StateFile,
    notifier: Option<Arc<DiscordNotifier>>,
    dry_run: bool,
    shutdown: watch::Receiver<bool>,
    /// Jobs finished since the queue was last empty.
    processed: usize,
}

impl EncodeWorker {
    pub fn new(
        queue: WorkQueue,
        presets: Arc<PresetTable>,
        scanner: Arc<dyn TrackScanner>,
        global: &GlobalConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            presets,
            scanner,
            handbrake: global.handbrake.clone(),
            manual_review: ManualReviewList::new(global.manual_review_path()),
            history: EncodeHistory::new(global.history_path()),
            state: StateFile::new(global.queue_state_path()),
            notifier: None,
            dry_run: false,
            shutdown,
            processed: 0,
        }
    }

    pub fn with_notifier(mut self, notifier: Option<Arc<DiscordNotifier>>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Logs the HandBrakeCLI command instead of running it.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs until shutdown, then persists whatever is left in the queue.
    pub async fn run(mut self) -> Result<()> {
        info!(dry_run = self.dry_run, "Starting encode worker");

        let mut shutdown = self.shutdown.clone();
        while let Some(mut job) = self.queue.next_job(&mut shutdown).await {
            let outcome = self.process_job(&mut job).await;

            if outcome == JobOutcome::Interrupted {
                self.save_state(Some(job)).await;
                return Ok(());
            }

            self.processed += 1;
            if self.queue.is_empty().await {
                info!(processed = self.processed, "Queue empty");
                if let Some(notifier) = &self.notifier {
                    if let Err(e) = notifier.notify_queue_empty(self.processed).await {
                        warn!(error = %e, "Failed to send Discord notification");
                    }
                }
                self.processed = 0;
            }
        }

        self.save_state(None).await;
        info!("Encode worker stopped");
        Ok(())
    }

    /// Processes one job. Never returns an error: every failure is an outcome.
    pub async fn process_job(&mut self, job: &mut EncodeJob) -> JobOutcome {
        job.start();
        info!(
            job_id = %job.id,
            file = %job.input_path.display(),
            preset = %job.preset_name,
            attempt = job.attempt_count,
            "Processing job"
        );

        // Presets are checked at enqueue time; reaching this means the table changed underneath.
        let rule = match self.presets.resolve(&job.preset_name) {
            Ok(rule) => rule.clone(),
            Err(e) => {
                error!(
                    file = %job.input_path.display(),
                    error = %e,
                    "Job references an unknown preset"
                );
                job.fail(e.to_string());
                return JobOutcome::Failed(e.to_string());
            }
        };

        let scanner = Arc::clone(&self.scanner);
        let input = job.input_path.clone();
        let descriptor = match tokio::task::spawn_blocking(move || scanner.scan(&input)).await {
            Ok(Ok(descriptor)) => descriptor,
            Ok(Err(e)) => {
                return self
                    .route_to_manual_review(job, format!("scan failed: {}", e))
                    .await
            }
            Err(e) => {
                return self
                    .route_to_manual_review(job, format!("scan task failed: {}", e))
                    .await
            }
        };

        let options = match select_tracks(&descriptor, &rule) {
            Ok(options) => options,
            Err(e) => return self.route_to_manual_review(job, e.to_string()).await,
        };

        info!(file = %job.file_name(), tracks = %options, "Tracks selected");

        let input = job.input_path.clone();
        let output = job.output_path.clone();
        let preset = job.preset_name.clone();
        let request = EncodeRequest {
            input: &input,
            output: &output,
            preset: &preset,
            options: &options,
        };

        if self.dry_run {
            let command = handbrake::command_line(&self.handbrake, &request);
            info!(command = %command, "Dry run, not encoding");
            return JobOutcome::DryRun(command);
        }

        let started = Instant::now();
        let result = self.encode_with_progress(job, &request).await;

        match result {
            Ok(()) => {
                let metadata = EncodeResultMetadata {
                    input_size: file_size(&input),
                    output_size: file_size(&output),
                    encode_duration_secs: started.elapsed().as_secs_f64(),
                };
                job.complete(metadata);
                info!(
                    file = %job.file_name(),
                    output = %output.display(),
                    duration_secs = started.elapsed().as_secs(),
                    "Encode completed"
                );

                if let Err(e) = self.history.record(HistoryRecord::from_job(job)) {
                    error!(error = %e, "Failed to record encode history");
                }
                if let Some(notifier) = &self.notifier {
                    if let Err(e) = notifier.notify_encode_success(job).await {
                        warn!(error = %e, "Failed to send Discord notification");
                    }
                }
                JobOutcome::Encoded
            }
            Err(EncoderError::Cancelled) => {
                job.interrupt();
                remove_partial_output(&output);
                warn!(file = %job.file_name(), "Encode interrupted");
                JobOutcome::Interrupted
            }
            Err(e) => {
                let message = e.to_string();
                job.fail(message.clone());
                error!(file = %job.file_name(), error = %message, "Encode failed");

                if let Some(notifier) = &self.notifier {
                    if let Err(e) = notifier.notify_encode_failure(job).await {
                        warn!(error = %e, "Failed to send Discord notification");
                    }
                }
                JobOutcome::Failed(message)
            }
        }
    }

    /// Runs HandBrakeCLI while copying its progress into the job.
    async fn encode_with_progress(
        &self,
        job: &mut EncodeJob,
        request: &EncodeRequest<'_>,
    ) -> Result<(), EncoderError> {
        let (progress_tx, mut progress_rx) = mpsc::channel(16);
        let encode = handbrake::encode(
            &self.handbrake,
            request,
            Some(progress_tx),
            self.shutdown.clone(),
        );
        tokio::pin!(encode);

        let mut last_logged = 0;
        loop {
            tokio::select! {
                result = &mut encode => return result,
                Some(percent) = progress_rx.recv() => {
                    job.update_progress(percent);
                    let decile = (percent / 10.0) as u32;
                    if decile > last_logged {
                        last_logged = decile;
                        info!(file = %job.file_name(), percent = decile * 10, "Encoding progress");
                    }
                }
            }
        }
    }

    async fn route_to_manual_review(&self, job: &mut EncodeJob, reason: String) -> JobOutcome {
        job.manual_review(reason.clone());
        warn!(
            file = %job.input_path.display(),
            preset = %job.preset_name,
            reason = %reason,
            "Sending file to manual review"
        );

        match self.manual_review.add(&job.input_path, &job.preset_name) {
            Ok(false) => info!(file = %job.file_name(), "Already on the manual review list"),
            Ok(true) => {}
            Err(e) => error!(error = %e, "Failed to update manual review list"),
        }

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify_manual_review(job).await {
                warn!(error = %e, "Failed to send Discord notification");
            }
        }

        JobOutcome::ManualReview(reason)
    }

    /// Writes the interrupted job and the pending queue for `run --resume`.
    async fn save_state(&self, current: Option<EncodeJob>) {
        let pending = self.queue.drain().await;
        let state = QueueState::new(current, pending);
        // Nothing to save: keep any state an earlier run left for --resume.
        if state.is_empty() {
            return;
        }

        let count = state.pending.len() + usize::from(state.current.is_some());
        match self.state.save(&state) {
            Ok(()) => info!(
                jobs = count,
                path = %self.state.path().display(),
                "Saved interrupted queue"
            ),
            Err(e) => error!(error = %e, "Failed to save queue state"),
        }
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn remove_partial_output(output: &Path) {
    if output.exists() {
        if let Err(e) = std::fs::remove_file(output) {
            warn!(path = %output.display(), error = %e, "Failed to remove partial output");
        }
    }
}
