//! MediaInfo wrapper for subtitle statistics.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use super::track::{SubtitleDetails, SubtitleMetrics};

/// Runs `mediainfo --Output=JSON` on a file and extracts its text tracks.
pub fn probe_subtitles(mediainfo: &Path, path: &Path) -> Result<Vec<SubtitleDetails>> {
    let output = Command::new(mediainfo)
        .arg("--Output=JSON")
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run {}", mediainfo.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "mediainfo exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("Failed to parse mediainfo output")?;

    parse_subtitle_details(&json)
}

/// Extracts `Text` tracks from a mediainfo JSON report, in file order.
///
/// MediaInfo reports every value as a string; unparseable numbers count as zero.
pub fn parse_subtitle_details(json: &serde_json::Value) -> Result<Vec<SubtitleDetails>> {
    let tracks = json
        .get("media")
        .and_then(|m| m.get("track"))
        .and_then(|t| t.as_array())
        .context("Missing media.track in mediainfo output")?;

    Ok(tracks
        .iter()
        .filter(|t| t.get("@type").and_then(|v| v.as_str()) == Some("Text"))
        .map(parse_text_track)
        .collect())
}

fn parse_text_track(track: &serde_json::Value) -> SubtitleDetails {
    let text = |key: &str| track.get(key).and_then(|v| v.as_str()).map(String::from);
    let flag = |key: &str| track.get(key).and_then(|v| v.as_str()) == Some("Yes");

    SubtitleDetails {
        title: text("Title"),
        language: text("Language"),
        is_forced: flag("Forced"),
        is_default: flag("Default"),
        metrics: SubtitleMetrics {
            element_count: number(track, "ElementCount").unwrap_or(0.0) as u64,
            stream_size: number(track, "StreamSize").unwrap_or(0.0) as u64,
            duration_secs: number(track, "Duration").unwrap_or(0.0),
        },
    }
}

fn number(track: &serde_json::Value, key: &str) -> Option<f64> {
    match track.get(key)? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
