//! File system watching for new video files.

pub mod folder;
pub mod manager;
pub mod registry;
pub mod stability;

pub use folder::{DetectedFile, FolderWatcher};
pub use manager::WatcherManager;
pub use registry::ProcessedRegistry;
pub use stability::StabilityChecker;
