//! Manages the folder watchers and feeds stable files to the work queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::folder::{DetectedFile, FolderWatcher, WatchHandle};
use super::registry::ProcessedRegistry;
use super::stability::StabilityChecker;
use crate::config::model::AppConfig;
use crate::error::WatcherError;
use crate::presets::PresetTable;
use crate::queue::job::EncodeJob;
use crate::queue::WorkQueue;

/// Watches every configured folder and enqueues `(file, preset)` jobs.
pub struct WatcherManager {
    watchers: Vec<FolderWatcher>,
    handles: Vec<WatchHandle>,
    file_tx: mpsc::Sender<DetectedFile>,
    file_rx: mpsc::Receiver<DetectedFile>,
    stability_checker: StabilityChecker,
    registry: ProcessedRegistry,
    queue: WorkQueue,
    presets: Arc<PresetTable>,
    shutdown: watch::Receiver<bool>,
}

impl WatcherManager {
    pub fn new(
        config: &AppConfig,
        queue: WorkQueue,
        presets: Arc<PresetTable>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, WatcherError> {
        let watchers = config
            .watch_folders
            .iter()
            .map(|folder| FolderWatcher::new(folder, &config.global.output_dir))
            .collect::<Result<Vec<_>, _>>()?;

        let stability = &config.global.stability_check;
        let stability_checker = StabilityChecker::new(
            Duration::from_secs(stability.duration_seconds),
            Duration::from_secs(stability.poll_interval_seconds.max(1)),
        );

        let mut registry = ProcessedRegistry::load(config.global.processed_registry_path());
        registry.prune_missing();

        let (file_tx, file_rx) = mpsc::channel(256);

        Ok(Self {
            watchers,
            handles: Vec::new(),
            file_tx,
            file_rx,
            stability_checker,
            registry,
            queue,
            presets,
            shutdown,
        })
    }

    /// Starts the OS watches for every folder.
    pub fn start_watching(&mut self) -> Result<(), WatcherError> {
        for watcher in &self.watchers {
            let handle = watcher.start(self.file_tx.clone())?;
            self.handles.push(handle);
        }
        info!(folders = self.handles.len(), "Folder watchers started");
        Ok(())
    }

    /// Tracks files already sitting in the folders that were never enqueued.
    pub fn queue_existing(&mut self) -> usize {
        let mut tracked = 0;
        for watcher in &self.watchers {
            for detected in watcher.scan_existing() {
                if self.registry.contains(&detected.folder, &detected.path) {
                    debug!(path = %detected.path.display(), "Already processed");
                    continue;
                }
                self.stability_checker.track(detected);
                tracked += 1;
            }
        }
        info!(files = tracked, "Existing files waiting for stability");
        tracked
    }

    /// Runs until shutdown.
    pub async fn run(mut self) -> Result<(), WatcherError> {
        let mut ticker = tokio::time::interval(self.stability_checker.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                Some(detected) = self.file_rx.recv() => {
                    if self.registry.contains(&detected.folder, &detected.path) {
                        debug!(
                            path = %detected.path.display(),
                            "Ignoring event for processed file"
                        );
                    } else {
                        self.stability_checker.track(detected);
                    }
                }

                _ = ticker.tick() => {
                    self.poll_ready().await;
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.registry.save() {
            error!(error = %e, "Failed to save processed-file registry");
        }
        info!(
            still_tracked = self.stability_checker.tracked_count(),
            "Watcher manager stopped"
        );
        Ok(())
    }

    /// Enqueues every file that became stable. Returns how many were enqueued.
    pub async fn poll_ready(&mut self) -> usize {
        let mut enqueued = 0;
        for detected in self.stability_checker.check_all() {
            match self.enqueue_file(&detected).await {
                Ok(true) => enqueued += 1,
                Ok(false) => {}
                Err(e) => error!(
                    path = %detected.path.display(),
                    error = %e,
                    "Failed to enqueue file"
                ),
            }
        }

        if enqueued > 0 {
            if let Err(e) = self.registry.save() {
                error!(error = %e, "Failed to save processed-file registry");
            }
        }
        enqueued
    }

    /// Enqueues one file with its folder's preset.
    async fn enqueue_file(&mut self, detected: &DetectedFile) -> Result<bool, WatcherError> {
        // Config validation guarantees this; a failure here means the table changed.
        self.presets
            .resolve(&detected.preset_name)
            .map_err(|e| WatcherError::EnqueueFailed {
                path: detected.path.clone(),
                message: e.to_string(),
            })?;

        let job = EncodeJob::for_file(
            detected.path.clone(),
            &detected.output_dir,
            detected.preset_name.clone(),
        );
        let job_id = job.id.clone();

        self.registry.insert(&detected.folder, &detected.path);

        if !self.queue.enqueue(job).await {
            warn!(path = %detected.path.display(), "File already queued");
            return Ok(false);
        }

        let queue_length = self.queue.queue_length().await;
        info!(
            job_id = %job_id,
            file = %detected.path.display(),
            preset = %detected.preset_name,
            queue_length,
            "Enqueued encoding job"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path, preset: &str) -> AppConfig {
        serde_yaml::from_str(&format!(
            r#"
global:
  output_dir: {out}
  state_dir: {state}
  stability_check:
    duration_seconds: 0
    poll_interval_seconds: 1
watch_folders:
  - path: {films}
    preset: "{preset}"
"#,
            out = root.join("out").display(),
            state = root.join("state").display(),
            films = root.join("films").display(),
            preset = preset,
        ))
        .unwrap()
    }

    fn manager(config: &AppConfig, queue: WorkQueue) -> (WatcherManager, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let manager =
            WatcherManager::new(config, queue, Arc::new(PresetTable::builtin()), rx).unwrap();
        (manager, tx)
    }

    #[tokio::test]
    async fn existing_files_are_enqueued_once() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("films")).unwrap();
        std::fs::write(dir.path().join("films/Film.mkv"), b"data").unwrap();
        let config = config(dir.path(), "1080p HD-Light 1500kbps");

        let queue = WorkQueue::new();
        let (mut first, _tx) = manager(&config, queue.clone());
        assert_eq!(first.queue_existing(), 1);
        assert_eq!(first.poll_ready().await, 1);

        let job = queue.dequeue().await.unwrap();
        assert_eq!(job.preset_name, "1080p HD-Light 1500kbps");
        assert_eq!(job.output_path, dir.path().join("out/Film_encoded.mkv"));

        // A restart reads the registry and skips the file.
        let (mut second, _tx) = manager(&config, queue.clone());
        assert_eq!(second.queue_existing(), 0);
    }

    #[tokio::test]
    async fn unknown_preset_is_not_enqueued() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("films")).unwrap();
        std::fs::write(dir.path().join("films/Film.mkv"), b"data").unwrap();
        let config = config(dir.path(), "Films 4K");

        let queue = WorkQueue::new();
        let (mut manager, _tx) = manager(&config, queue.clone());
        manager.queue_existing();
        assert_eq!(manager.poll_ready().await, 0);
        assert!(queue.is_empty().await);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn run_future_can_be_spawned() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), "1080p HD-Light 1500kbps");
        let (mut manager, _tx) = manager(&config, WorkQueue::new());

        assert_send(&manager.poll_ready());
        assert_send(&manager.run());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), "1080p HD-Light 1500kbps");
        let (manager, tx) = manager(&config, WorkQueue::new());

        let handle = tokio::spawn(manager.run());
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
