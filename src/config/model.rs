//! Configuration data structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::presets::{
    default_audio_exclusion_keywords, default_burn_keywords, default_french_codes,
    default_subtitle_exclusion_keywords, AudioMode, AudioScoring, SubtitleMode, SubtitleStrategy,
};

/// Root configuration structure containing all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global application settings.
    pub global: GlobalConfig,

    /// Track-selection presets. The stock presets apply when empty.
    #[serde(default)]
    pub presets: Vec<PresetConfig>,

    /// Folders to watch, each bound to one preset.
    #[serde(default)]
    pub watch_folders: Vec<WatchFolder>,
}

/// Global application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Default directory for encoded files.
    pub output_dir: PathBuf,

    /// Directory holding the manual-review list, history and queue state.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// HandBrakeCLI settings.
    #[serde(default)]
    pub handbrake: HandBrakeConfig,

    /// MediaInfo binary used for subtitle statistics. Disabled when unset.
    #[serde(default = "default_mediainfo_path")]
    pub mediainfo_path: Option<PathBuf>,

    /// File stability detection settings.
    #[serde(default)]
    pub stability_check: StabilityConfig,

    /// Notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl GlobalConfig {
    pub fn manual_review_path(&self) -> PathBuf {
        self.state_dir.join("manual_review.txt")
    }

    pub fn history_path(&self) -> PathBuf {
        self.state_dir.join("successful_encodings.json")
    }

    pub fn queue_state_path(&self) -> PathBuf {
        self.state_dir.join("interrupted_queue.json")
    }

    /// Files already handed to the queue, per watch folder.
    pub fn processed_registry_path(&self) -> PathBuf {
        self.state_dir.join("processed_files.json")
    }
}

/// HandBrakeCLI invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandBrakeConfig {
    /// HandBrakeCLI binary.
    #[serde(default = "default_handbrake_path")]
    pub path: PathBuf,

    /// Exported HandBrake presets passed with `--preset-import-file`.
    #[serde(default)]
    pub presets_file: Option<PathBuf>,

    /// Arguments appended after the track options.
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,
}

/// File stability detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Duration in seconds the file size must remain stable.
    #[serde(default = "default_stability_duration")]
    pub duration_seconds: u64,

    /// Interval in seconds between stability checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    /// Discord webhook settings.
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
}

/// Discord webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Discord webhook URL.
    pub webhook_url: String,

    /// Which events trigger notifications.
    #[serde(default)]
    pub events: DiscordEvents,

    /// Optional user ID to mention on failures.
    #[serde(default)]
    pub mention_on_failure: Option<String>,
}

/// Discord notification event toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordEvents {
    /// Notify on successful encode completion.
    #[serde(default = "default_true")]
    pub on_encode_success: bool,

    /// Notify on encode failure.
    #[serde(default = "default_true")]
    pub on_encode_failure: bool,

    /// Notify when a file is sent to manual review.
    #[serde(default = "default_true")]
    pub on_manual_review: bool,

    /// Notify when the queue becomes empty.
    #[serde(default)]
    pub on_queue_empty: bool,
}

/// A track-selection preset as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetConfig {
    /// Preset name; also the HandBrake preset passed with `--preset`.
    pub name: String,

    pub audio_mode: AudioMode,

    #[serde(default)]
    pub min_audio_tracks: Option<usize>,

    #[serde(default)]
    pub max_audio_tracks: Option<usize>,

    pub subtitle_mode: SubtitleMode,

    #[serde(default)]
    pub subtitle_strategy: SubtitleStrategy,

    #[serde(default = "default_audio_exclusion_keywords")]
    pub audio_exclusion_keywords: Vec<String>,

    #[serde(default = "default_subtitle_exclusion_keywords")]
    pub subtitle_exclusion_keywords: Vec<String>,

    #[serde(default = "default_burn_keywords")]
    pub burn_keywords: Vec<String>,

    #[serde(default = "default_french_codes")]
    pub french_codes: Vec<String>,

    #[serde(default)]
    pub scoring: AudioScoring,
}

/// A watched input folder bound to a preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchFolder {
    /// Input directory to watch for new files.
    pub path: PathBuf,

    /// Preset applied to every file found here.
    pub preset: String,

    /// Output directory; `global.output_dir` when unset.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Whether to watch subdirectories recursively.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// File patterns to match (e.g., ["*.mkv", "*.mp4"]).
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/vf-encode")
}

fn default_handbrake_path() -> PathBuf {
    PathBuf::from("HandBrakeCLI")
}

pub(crate) fn default_mediainfo_path() -> Option<PathBuf> {
    Some(PathBuf::from("mediainfo"))
}

fn default_extra_args() -> Vec<String> {
    vec![
        "--aencoder=aac".to_string(),
        "--ab=192".to_string(),
        "--mixdown=5point1".to_string(),
    ]
}

fn default_stability_duration() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_file_patterns() -> Vec<String> {
    vec!["*.mkv".to_string(), "*.mp4".to_string(), "*.avi".to_string()]
}

impl Default for HandBrakeConfig {
    fn default() -> Self {
        Self {
            path: default_handbrake_path(),
            presets_file: None,
            extra_args: default_extra_args(),
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_stability_duration(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl Default for DiscordEvents {
    fn default() -> Self {
        Self {
            on_encode_success: true,
            on_encode_failure: true,
            on_manual_review: true,
            on_queue_empty: false,
        }
    }
}
