//! HandBrakeCLI scanner producing [`TrackDescriptor`]s.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::ScanError;

use super::mediainfo;
use super::track::TrackDescriptor;

/// Marker HandBrakeCLI prints before the title-set JSON.
const TITLE_SET_MARKER: &str = "JSON Title Set:";

/// Source of track metadata for a media file.
#[cfg_attr(test, mockall::automock)]
pub trait TrackScanner: Send + Sync {
    fn scan(&self, path: &Path) -> Result<TrackDescriptor, ScanError>;
}

/// Scanner backed by `HandBrakeCLI --scan --json`, enriched by mediainfo when available.
#[derive(Debug, Clone)]
pub struct HandBrakeScanner {
    handbrake: PathBuf,
    mediainfo: Option<PathBuf>,
}

impl HandBrakeScanner {
    pub fn new(handbrake: impl Into<PathBuf>, mediainfo: Option<PathBuf>) -> Self {
        Self {
            handbrake: handbrake.into(),
            mediainfo,
        }
    }

    fn run_handbrake_scan(&self, path: &Path) -> Result<String, ScanError> {
        let command = format!("{} -i {} --scan --json", self.handbrake.display(), path.display());
        debug!(command = %command, "Scanning media file");

        let output = Command::new(&self.handbrake)
            .arg("-i")
            .arg(path)
            .args(["--scan", "--json"])
            .output()
            .map_err(|e| ScanError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ScanError::NonZeroExit {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(ScanError::EmptyOutput);
        }

        Ok(stdout)
    }
}

impl TrackScanner for HandBrakeScanner {
    fn scan(&self, path: &Path) -> Result<TrackDescriptor, ScanError> {
        let stdout = self.run_handbrake_scan(path)?;
        let mut descriptor = TrackDescriptor::from_scan_json(extract_title_set(&stdout)?)?;

        if let Some(mediainfo) = &self.mediainfo {
            match mediainfo::probe_subtitles(mediainfo, path) {
                Ok(details) => descriptor.apply_subtitle_details(&details),
                Err(e) => warn!(
                    file = %path.display(),
                    error = %e,
                    "mediainfo unavailable, subtitles will be analyzed without statistics"
                ),
            }
        }

        Ok(descriptor)
    }
}

/// Returns the JSON object that follows the title-set marker in scanner output.
///
/// Spans from the first `{` after the marker (or the start of the output when the marker
/// is missing) to the last `}`.
pub fn extract_title_set(stdout: &str) -> Result<&str, ScanError> {
    let search_from = stdout.find(TITLE_SET_MARKER).unwrap_or(0);

    let start = stdout[search_from..]
        .find('{')
        .map(|i| search_from + i)
        .ok_or_else(|| ScanError::InvalidJson("no JSON object in scanner output".to_string()))?;
    let end = stdout
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| {
            ScanError::InvalidJson("unterminated JSON object in scanner output".to_string())
        })?;

    Ok(&stdout[start..=end])
}
