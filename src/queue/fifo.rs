//! In-memory FIFO of pending encode jobs.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Notify};

use super::job::EncodeJob;

/// Shared work queue between the watchers (producers) and the encode worker (consumer).
#[derive(Clone, Default)]
pub struct WorkQueue {
    jobs: Arc<Mutex<VecDeque<EncodeJob>>>,
    notify: Arc<Notify>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job to the back of the queue.
    ///
    /// Returns false without enqueuing when the same input file is already waiting.
    pub async fn enqueue(&self, job: EncodeJob) -> bool {
        let mut jobs = self.jobs.lock().await;
        if jobs.iter().any(|j| j.input_path == job.input_path) {
            return false;
        }
        jobs.push_back(job);
        drop(jobs);

        self.notify.notify_one();
        true
    }

    /// Pops the oldest job, if any.
    pub async fn dequeue(&self) -> Option<EncodeJob> {
        self.jobs.lock().await.pop_front()
    }

    /// Waits for the next job. Returns `None` once shutdown is signalled.
    pub async fn next_job(&self, shutdown: &mut watch::Receiver<bool>) -> Option<EncodeJob> {
        loop {
            if *shutdown.borrow() {
                return None;
            }
            if let Some(job) = self.dequeue().await {
                return Some(job);
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    /// Returns the number of jobs waiting.
    pub async fn queue_length(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Returns true if `path` is waiting in the queue.
    pub async fn contains(&self, path: &Path) -> bool {
        self.jobs.lock().await.iter().any(|j| j.input_path == path)
    }

    /// Copies the waiting jobs in queue order.
    pub async fn list_queue(&self) -> Vec<EncodeJob> {
        self.jobs.lock().await.iter().cloned().collect()
    }

    /// Removes every waiting job and returns them in queue order.
    pub async fn drain(&self) -> Vec<EncodeJob> {
        self.jobs.lock().await.drain(..).collect()
    }
}
