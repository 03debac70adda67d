//! Work queue, job model and on-disk pipeline records.

pub mod fifo;
pub mod history;
pub mod job;
pub mod manual;
pub mod state;

pub use fifo::WorkQueue;
pub use history::{EncodeHistory, HistoryRecord};
pub use job::{EncodeJob, JobStatus};
pub use manual::{ManualReviewEntry, ManualReviewList};
pub use state::{QueueState, StateFile};
