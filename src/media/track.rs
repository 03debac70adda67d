//! Normalized audio/subtitle track model built from scanner output.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// One audio or subtitle track of a media title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track number passed back to the transcoder.
    pub track_number: u32,
    /// Raw language code as reported by the scanner ("" when unknown).
    pub language_code: String,
    /// Free-text title ("" when absent).
    pub name: String,
    /// Default disposition.
    pub is_default: bool,
    /// Forced disposition (subtitles).
    pub is_forced: bool,
    /// Subtitle statistics from mediainfo, when available.
    pub metrics: Option<SubtitleMetrics>,
}

impl Track {
    /// Creates a track with only number, language and name set.
    pub fn new(
        track_number: u32,
        language_code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            track_number,
            language_code: language_code.into(),
            name: name.into(),
            is_default: false,
            is_forced: false,
            metrics: None,
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_forced(mut self, is_forced: bool) -> Self {
        self.is_forced = is_forced;
        self
    }

    pub fn with_metrics(mut self, metrics: SubtitleMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Lower-cased language code.
    pub fn language(&self) -> String {
        self.language_code.trim().to_lowercase()
    }
}

/// Subtitle stream statistics used to tell full dialogue from forced-only tracks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubtitleMetrics {
    /// Number of subtitle events.
    pub element_count: u64,
    /// Stream size in bytes.
    pub stream_size: u64,
    /// Stream duration in seconds.
    pub duration_secs: f64,
}

impl SubtitleMetrics {
    /// Subtitle events per minute of stream duration (0 when duration is unknown).
    pub fn elements_per_minute(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.element_count as f64 / (self.duration_secs / 60.0)
        } else {
            0.0
        }
    }
}

/// The audio and subtitle tracks of one media title, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub audio_tracks: Vec<Track>,
    pub subtitle_tracks: Vec<Track>,
}

impl TrackDescriptor {
    pub fn new(audio_tracks: Vec<Track>, subtitle_tracks: Vec<Track>) -> Self {
        Self {
            audio_tracks,
            subtitle_tracks,
        }
    }

    /// Builds a descriptor from HandBrake `--scan --json` title-set JSON.
    ///
    /// Only the first title is consulted. Missing `AudioList`/`SubtitleList` keys yield
    /// empty track lists; missing optional fields default to empty/false.
    pub fn from_scan_json(json: &str) -> Result<Self, ScanError> {
        let scan: ScanOutput =
            serde_json::from_str(json).map_err(|e| ScanError::InvalidJson(e.to_string()))?;

        let title = scan.title_list.into_iter().next().ok_or(ScanError::NoTitle)?;

        let audio_tracks = title
            .audio_list
            .into_iter()
            .map(|a| Track {
                track_number: a.track_number,
                language_code: a.language_code.unwrap_or_default(),
                name: a.name.unwrap_or_default(),
                is_default: a.default.unwrap_or(false),
                is_forced: false,
                metrics: None,
            })
            .collect();

        let subtitle_tracks = title
            .subtitle_list
            .into_iter()
            .map(|s| Track {
                track_number: s.track_number,
                language_code: s.language_code.unwrap_or_default(),
                name: s.name.unwrap_or_default(),
                is_default: s.default.unwrap_or(false),
                is_forced: s.forced.unwrap_or(false),
                metrics: None,
            })
            .collect();

        Ok(Self {
            audio_tracks,
            subtitle_tracks,
        })
    }

    /// Subtitle-only descriptor built from mediainfo alone, numbered from 1 in file order.
    pub fn from_subtitle_details(details: &[SubtitleDetails]) -> Self {
        let subtitle_tracks = details
            .iter()
            .zip(1u32..)
            .map(|(detail, number)| {
                Track::new(
                    number,
                    detail.language.clone().unwrap_or_default(),
                    detail.title.clone().unwrap_or_default(),
                )
                .with_forced(detail.is_forced)
                .with_default(detail.is_default)
                .with_metrics(detail.metrics)
            })
            .collect();

        Self::new(Vec::new(), subtitle_tracks)
    }

    /// Merges mediainfo text-track details into the subtitle list.
    ///
    /// The n-th mediainfo text track describes the n-th scanned subtitle. Extra entries on
    /// either side are left alone.
    pub fn apply_subtitle_details(&mut self, details: &[SubtitleDetails]) {
        for (track, detail) in self.subtitle_tracks.iter_mut().zip(details) {
            track.metrics = Some(detail.metrics);
            track.is_forced = track.is_forced || detail.is_forced;
            track.is_default = track.is_default || detail.is_default;
            if track.name.trim().is_empty() {
                if let Some(title) = &detail.title {
                    track.name = title.clone();
                }
            }
        }
    }
}

/// Per-subtitle information extracted from a mediainfo report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubtitleDetails {
    pub title: Option<String>,
    pub language: Option<String>,
    pub is_forced: bool,
    pub is_default: bool,
    pub metrics: SubtitleMetrics,
}

/// Top-level HandBrake scan document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanOutput {
    #[serde(default)]
    title_list: Vec<ScanTitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanTitle {
    #[serde(default)]
    audio_list: Vec<ScanAudio>,
    #[serde(default)]
    subtitle_list: Vec<ScanSubtitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanAudio {
    track_number: u32,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    default: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanSubtitle {
    track_number: u32,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    forced: Option<bool>,
    #[serde(default)]
    default: Option<bool>,
}
