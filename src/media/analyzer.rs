//! French subtitle analysis: regional variant ranking and verbal / non-verbal classification.
//!
//! A verbal track carries the full dialogue. A non-verbal track only covers signs, songs
//! and foreign-language lines (what a dubbed release burns in as "forced").

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::presets::PresetRule;

use super::normalize::{contains_any, normalize};
use super::track::{SubtitleMetrics, Track, TrackDescriptor};

/// Forced-only tracks rarely exceed this many events...
const NON_VERBAL_MAX_ELEMENTS: u64 = 20;
/// ...or this many bytes.
const NON_VERBAL_MAX_SIZE: u64 = 1000;
const VERBAL_MIN_ELEMENTS: u64 = 100;
const VERBAL_MIN_SIZE: u64 = 10_000;
const VERBAL_MIN_ELEMENTS_PER_MINUTE: f64 = 5.0;

const HEARING_IMPAIRED_KEYWORDS: &[&str] =
    &["sdh", "malentendant", "sourd", "hearing", "impaired", "deaf"];

/// Dialect origin of a French subtitle track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrenchVariant {
    France,
    European,
    Standard,
    Belgian,
    Swiss,
    Quebecois,
    Canadian,
}

impl std::fmt::Display for FrenchVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::France => write!(f, "France"),
            Self::European => write!(f, "European"),
            Self::Standard => write!(f, "Standard"),
            Self::Belgian => write!(f, "Belgian"),
            Self::Swiss => write!(f, "Swiss"),
            Self::Quebecois => write!(f, "Québécois"),
            Self::Canadian => write!(f, "Canadian"),
        }
    }
}

/// Whether a subtitle track carries full dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleKind {
    Verbal,
    NonVerbal,
}

impl std::fmt::Display for SubtitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verbal => write!(f, "verbal"),
            Self::NonVerbal => write!(f, "non-verbal"),
        }
    }
}

/// Analysis result for one French subtitle track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedSubtitle {
    pub track_number: u32,
    /// 1-based position in the scanned subtitle list.
    pub position: usize,
    pub name: String,
    pub language_code: String,
    pub variant: FrenchVariant,
    pub priority: u8,
    pub hearing_impaired: bool,
    pub is_forced: bool,
    pub kind: SubtitleKind,
    pub metrics: Option<SubtitleMetrics>,
}

impl AnalyzedSubtitle {
    fn stream_size(&self) -> u64 {
        self.metrics.map(|m| m.stream_size).unwrap_or(0)
    }
}

/// Ranked French subtitle tracks of one file plus the recommended pick per class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubtitleAnalysis {
    /// Total subtitle tracks in the file, French or not.
    pub total_tracks: usize,
    /// French tracks, best first.
    pub tracks: Vec<AnalyzedSubtitle>,
    pub recommended_verbal: Option<u32>,
    pub recommended_non_verbal: Option<u32>,
}

impl SubtitleAnalysis {
    /// Verbal tracks, best first.
    pub fn verbal(&self) -> impl Iterator<Item = &AnalyzedSubtitle> {
        self.tracks.iter().filter(|t| t.kind == SubtitleKind::Verbal)
    }

    /// Non-verbal tracks, best first.
    pub fn non_verbal(&self) -> impl Iterator<Item = &AnalyzedSubtitle> {
        self.tracks.iter().filter(|t| t.kind == SubtitleKind::NonVerbal)
    }

    pub fn get(&self, track_number: u32) -> Option<&AnalyzedSubtitle> {
        self.tracks.iter().find(|t| t.track_number == track_number)
    }

    /// Human-readable report for the `analyze` command and debug logs.
    pub fn summary(&self) -> String {
        let mut out = String::from("French subtitle analysis\n\n");

        if self.tracks.is_empty() {
            let _ = writeln!(
                out,
                "No French subtitle track found ({} subtitle track(s) in file).",
                self.total_tracks
            );
            return out;
        }

        let variants: BTreeSet<FrenchVariant> = self.tracks.iter().map(|t| t.variant).collect();
        let variants: Vec<String> = variants.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(
            out,
            "French subtitle tracks: {} of {}",
            self.tracks.len(),
            self.total_tracks
        );
        let _ = writeln!(out, "Variants: {}\n", variants.join(", "));

        self.write_recommendation(
            &mut out,
            "Recommended verbal track (full dialogue)",
            self.recommended_verbal,
        );
        self.write_recommendation(
            &mut out,
            "Recommended non-verbal track (forced/signs)",
            self.recommended_non_verbal,
        );

        let alternatives: Vec<&AnalyzedSubtitle> = self
            .tracks
            .iter()
            .filter(|t| Some(t.track_number) != self.recommended_verbal)
            .filter(|t| Some(t.track_number) != self.recommended_non_verbal)
            .collect();

        if !alternatives.is_empty() {
            out.push_str("Other French tracks:\n");
            for (i, track) in alternatives.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, describe(track));
            }
        }

        out
    }

    fn write_recommendation(&self, out: &mut String, heading: &str, track_number: Option<u32>) {
        match track_number.and_then(|n| self.get(n)) {
            Some(track) => {
                let _ = writeln!(out, "{}:", heading);
                let _ = writeln!(out, "- {}", describe(track));
                if let Some(metrics) = track.metrics {
                    let _ = writeln!(
                        out,
                        "- Elements: {} ({:.2} per minute)",
                        metrics.element_count,
                        metrics.elements_per_minute()
                    );
                    let _ = writeln!(
                        out,
                        "- Size: {} bytes ({:.2} KB)",
                        metrics.stream_size,
                        metrics.stream_size as f64 / 1024.0
                    );
                }
                out.push('\n');
            }
            None => {
                let _ = writeln!(out, "{}: none\n", heading);
            }
        }
    }
}

fn describe(track: &AnalyzedSubtitle) -> String {
    let mut text = format!(
        "Subtitle #{} (track {}), {}, {}",
        track.position, track.track_number, track.variant, track.kind
    );
    if track.hearing_impaired {
        text.push_str(", SDH");
    }
    if track.is_forced {
        text.push_str(", forced");
    }
    if !track.name.is_empty() {
        let _ = write!(text, ", title: {}", track.name);
    }
    text
}

/// Analyzes the French subtitle tracks of `descriptor`.
pub fn analyze_subtitles(descriptor: &TrackDescriptor, rule: &PresetRule) -> SubtitleAnalysis {
    let mut tracks: Vec<AnalyzedSubtitle> = descriptor
        .subtitle_tracks
        .iter()
        .enumerate()
        .filter_map(|(index, track)| analyze_track(track, index + 1, rule))
        .collect();

    tracks.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.hearing_impaired.cmp(&b.hearing_impaired))
            .then((a.kind == SubtitleKind::NonVerbal).cmp(&(b.kind == SubtitleKind::NonVerbal)))
            .then(b.stream_size().cmp(&a.stream_size()))
    });

    let recommended_verbal = recommend(&tracks, SubtitleKind::Verbal);
    let recommended_non_verbal = recommend(&tracks, SubtitleKind::NonVerbal);

    SubtitleAnalysis {
        total_tracks: descriptor.subtitle_tracks.len(),
        tracks,
        recommended_verbal,
        recommended_non_verbal,
    }
}

/// Best standard track of `kind`, else the best hearing-impaired one.
fn recommend(sorted: &[AnalyzedSubtitle], kind: SubtitleKind) -> Option<u32> {
    let mut of_kind = sorted.iter().filter(|t| t.kind == kind);
    let standard = of_kind.clone().find(|t| !t.hearing_impaired);
    standard.or_else(|| of_kind.next()).map(|t| t.track_number)
}

fn analyze_track(track: &Track, position: usize, rule: &PresetRule) -> Option<AnalyzedSubtitle> {
    let title = normalize(&track.name);
    let (variant, priority) = detect_variant(track, &title, rule)?;

    Some(AnalyzedSubtitle {
        track_number: track.track_number,
        position,
        name: track.name.clone(),
        language_code: track.language_code.clone(),
        variant,
        priority,
        hearing_impaired: contains_any(&title, HEARING_IMPAIRED_KEYWORDS),
        is_forced: track.is_forced,
        kind: classify(track, &title, rule),
        metrics: track.metrics,
    })
}

/// Returns the regional variant and its priority, or `None` for non-French tracks.
fn detect_variant(track: &Track, title: &str, rule: &PresetRule) -> Option<(FrenchVariant, u8)> {
    let language = track.language();
    let has = |words: &[&str]| contains_any(title, words);

    if rule.is_french_code(&language) || language == "fr-fr" {
        let detected = if has(&["france", "vff"]) {
            (FrenchVariant::France, 10)
        } else if has(&["canad"]) {
            (FrenchVariant::Canadian, 5)
        } else if has(&["quebec", "vfq"]) {
            (FrenchVariant::Quebecois, 6)
        } else if has(&["belg"]) {
            (FrenchVariant::Belgian, 7)
        } else if has(&["suisse"]) {
            (FrenchVariant::Swiss, 7)
        } else {
            upgrade_standard(title)
        };
        return Some(detected);
    }

    if has(&["vff"]) {
        Some((FrenchVariant::France, 10))
    } else if has(&["francais", "french", "france"]) {
        Some((FrenchVariant::France, 9))
    } else if has(&["vfq", "quebecois", "quebec"]) {
        Some((FrenchVariant::Quebecois, 6))
    } else if has(&["canad"]) {
        Some((FrenchVariant::Canadian, 5))
    } else {
        None
    }
}

/// Title markers can only raise a track whose language code alone says "French".
fn upgrade_standard(title: &str) -> (FrenchVariant, u8) {
    if contains_any(title, &["vff"]) {
        (FrenchVariant::France, 10)
    } else if contains_any(title, &["french", "fre", "fra", "fr-fr", "france"]) {
        (FrenchVariant::France, 9)
    } else if contains_any(title, &["european", "europe"]) {
        (FrenchVariant::European, 9)
    } else {
        (FrenchVariant::Standard, 8)
    }
}

/// Verbal / non-verbal classification from mediainfo statistics.
///
/// Without statistics, the forced flag or a burn keyword in the title means non-verbal.
pub fn classify(track: &Track, normalized_title: &str, rule: &PresetRule) -> SubtitleKind {
    let Some(metrics) = track.metrics else {
        return if track.is_forced || contains_any(normalized_title, &rule.burn_keywords) {
            SubtitleKind::NonVerbal
        } else {
            SubtitleKind::Verbal
        };
    };

    let sparse = metrics.element_count < NON_VERBAL_MAX_ELEMENTS
        && metrics.stream_size < NON_VERBAL_MAX_SIZE;
    if track.is_forced || sparse {
        SubtitleKind::NonVerbal
    } else if metrics.element_count > VERBAL_MIN_ELEMENTS || metrics.stream_size > VERBAL_MIN_SIZE {
        SubtitleKind::Verbal
    } else if metrics.elements_per_minute() > VERBAL_MIN_ELEMENTS_PER_MINUTE {
        SubtitleKind::Verbal
    } else {
        SubtitleKind::NonVerbal
    }
}
