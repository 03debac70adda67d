//! Error types for the encoding pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },

    #[error("Unknown preset '{name}'{}", did_you_mean(suggestion))]
    UnknownPreset {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Preset '{name}' is defined more than once")]
    DuplicatePreset { name: String },
}

/// Outcomes of the track selectors that send a file to manual review.
///
/// None of these are crashes: the worker records the message next to the file and
/// moves on to the next job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no audio track available")]
    NoAudioTracks,

    #[error("no usable French audio track (excluded or missing)")]
    NoFrenchAudio,

    #[error("multi-language preset needs at least 2 distinct languages, found {found}")]
    InsufficientMultiTracks { found: usize },

    #[error("{count} valid audio tracks found, original-language preset expects exactly one")]
    TooManyValidTracks { count: usize },

    #[error("{count} audio track(s) selected, preset allows {}..={}", bound(min), bound(max))]
    TrackCountOutOfBounds {
        count: usize,
        min: Option<usize>,
        max: Option<usize>,
    },

    #[error("no French subtitle track available")]
    NoFrenchSubtitles,

    #[error("too many French subtitle tracks: {kept} kept, at most {allowed} allowed")]
    TooManySubtitles { kept: usize, allowed: usize },
}

/// Track metadata acquisition errors.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    #[error("'{command}' exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Scanner produced no output")]
    EmptyOutput,

    #[error("Failed to parse scanner JSON: {0}")]
    InvalidJson(String),

    #[error("Scan output contains no title")]
    NoTitle,
}

/// Work queue and persisted-state errors.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize queue state: {0}")]
    SerializationFailed(String),

    #[error("Entry not found: {entry}")]
    EntryNotFound { entry: String },
}

/// Encoding operation errors.
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("HandBrakeCLI failed with exit code {code}: {stderr}")]
    HandBrakeFailed { code: i32, stderr: String },

    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Encoding cancelled")]
    Cancelled,

    #[error("Output verification failed: {0}")]
    VerificationFailed(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to watch directory '{path}': {message}")]
    WatchFailed { path: PathBuf, message: String },

    #[error("Failed to enqueue '{path}': {message}")]
    EnqueueFailed { path: PathBuf, message: String },

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// Notification sending errors.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Discord webhook failed: {0}")]
    DiscordFailed(String),

    #[error("HTTP request failed: {0}")]
    HttpFailed(#[from] reqwest::Error),
}

/// External tool detection errors.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

fn bound(limit: &Option<usize>) -> String {
    limit.map(|l| l.to_string()).unwrap_or_default()
}
