//! HandBrakeCLI encoding and the job worker.

pub mod handbrake;
pub mod worker;

pub use worker::{EncodeWorker, JobOutcome};
