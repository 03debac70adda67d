//! Audio track scoring and selection.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SelectionError;
use crate::presets::{AudioMode, PresetRule};

use super::normalize::{contains_any, normalize};
use super::track::{Track, TrackDescriptor};

const SCORE_FRENCH_LANGUAGE: i32 = 100;
const SCORE_KNOWN_LANGUAGE: i32 = 20;
const SCORE_FRENCH_NAME: i32 = 60;
const PENALTY_REGIONAL: i32 = -20;
const PENALTY_ACCESSIBILITY: i32 = -100;
const SCORE_DEFAULT: i32 = 10;

/// Audio track numbers to keep, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSelection {
    pub tracks: Vec<u32>,
}

/// A track with its score and exclusion status, for ranking and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTrack<'a> {
    pub track: &'a Track,
    pub score: i32,
    /// Name matched an exclusion keyword; never a candidate.
    pub excluded: bool,
}

impl ScoredTrack<'_> {
    fn is_candidate(&self) -> bool {
        !self.excluded && self.score > 0
    }
}

/// Scores one audio track against a preset's marker lists.
pub fn score_track(track: &Track, rule: &PresetRule) -> i32 {
    let name = normalize(&track.name);
    let language = track.language();
    let mut score = 0;

    if rule.is_french_code(&language) {
        score += SCORE_FRENCH_LANGUAGE;
    }
    if !language.is_empty() {
        score += SCORE_KNOWN_LANGUAGE;
    }
    if name.trim().is_empty() || contains_any(&name, &rule.scoring.french_markers) {
        score += SCORE_FRENCH_NAME;
    }
    if contains_any(&name, &rule.scoring.regional_markers) {
        score += PENALTY_REGIONAL;
    }
    if contains_any(&name, &rule.scoring.accessibility_markers) {
        score += PENALTY_ACCESSIBILITY;
    }
    if track.is_default {
        score += SCORE_DEFAULT;
    }

    score
}

/// Scores every audio track and sorts them best first.
///
/// The sort is stable, so equal scores keep scan order.
pub fn score_audio_tracks<'a>(
    descriptor: &'a TrackDescriptor,
    rule: &PresetRule,
) -> Vec<ScoredTrack<'a>> {
    let mut scored: Vec<ScoredTrack<'a>> = descriptor
        .audio_tracks
        .iter()
        .map(|track| ScoredTrack {
            track,
            score: score_track(track, rule),
            excluded: contains_any(&normalize(&track.name), &rule.audio_exclusion_keywords),
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Chooses the audio tracks to keep for `rule`.
pub fn select_audio(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<AudioSelection, SelectionError> {
    let tracks = &descriptor.audio_tracks;

    if tracks.is_empty() {
        return Err(SelectionError::NoAudioTracks);
    }

    if tracks.len() == 1 && rule.audio_mode != AudioMode::MultiAllLanguages {
        let only = &tracks[0];
        if !rule.is_french_code(&only.language_code) {
            warn!(
                preset = %rule.name,
                track = only.track_number,
                language = %only.language_code,
                "Only one audio track available and it is not French, keeping it anyway"
            );
        }
        return Ok(AudioSelection {
            tracks: vec![only.track_number],
        });
    }

    let scored = score_audio_tracks(descriptor, rule);
    for entry in &scored {
        debug!(
            track = entry.track.track_number,
            language = %entry.track.language_code,
            name = %entry.track.name,
            score = entry.score,
            excluded = entry.excluded,
            "Scored audio track"
        );
    }

    let candidates: Vec<&Track> = scored
        .iter()
        .filter(|s| s.is_candidate())
        .map(|s| s.track)
        .collect();

    let selected = match rule.audio_mode {
        AudioMode::SingleFrench => select_single_french(&candidates, rule)?,
        AudioMode::MultiAllLanguages => select_multi(&candidates, rule)?,
        AudioMode::VoLimited => select_vo(&candidates)?,
    };

    check_bounds(selected.len(), rule)?;

    Ok(AudioSelection { tracks: selected })
}

fn select_single_french(
    candidates: &[&Track],
    rule: &PresetRule,
) -> Result<Vec<u32>, SelectionError> {
    candidates
        .iter()
        .find(|t| rule.is_french_code(&t.language_code))
        .map(|t| vec![t.track_number])
        .ok_or(SelectionError::NoFrenchAudio)
}

fn select_multi(candidates: &[&Track], rule: &PresetRule) -> Result<Vec<u32>, SelectionError> {
    let mut seen_languages: Vec<String> = Vec::new();
    let mut kept: Vec<&Track> = Vec::new();

    for track in candidates {
        let language = track.language();
        if !seen_languages.contains(&language) {
            seen_languages.push(language);
            kept.push(track);
        }
    }

    if kept.len() < 2 {
        return Err(SelectionError::InsufficientMultiTracks { found: kept.len() });
    }

    let french_index = kept
        .iter()
        .position(|t| rule.is_french_code(&t.language_code))
        .ok_or(SelectionError::NoFrenchAudio)?;

    let french = kept.remove(french_index);
    kept.insert(0, french);

    Ok(kept.into_iter().map(|t| t.track_number).collect())
}

fn select_vo(candidates: &[&Track]) -> Result<Vec<u32>, SelectionError> {
    match candidates {
        [] => Err(SelectionError::NoAudioTracks),
        [only] => Ok(vec![only.track_number]),
        many => Err(SelectionError::TooManyValidTracks { count: many.len() }),
    }
}

fn check_bounds(count: usize, rule: &PresetRule) -> Result<(), SelectionError> {
    let too_few = rule.min_audio_tracks.is_some_and(|min| count < min);
    let too_many = rule.max_audio_tracks.is_some_and(|max| count > max);

    if too_few || too_many {
        return Err(SelectionError::TrackCountOutOfBounds {
            count,
            min: rule.min_audio_tracks,
            max: rule.max_audio_tracks,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::SubtitleMode;

    fn rule(mode: AudioMode) -> PresetRule {
        PresetRule::new("test", mode, SubtitleMode::None)
    }

    fn audio(tracks: Vec<Track>) -> TrackDescriptor {
        TrackDescriptor::new(tracks, vec![])
    }

    #[test]
    fn scores_follow_marker_table() {
        let rule = rule(AudioMode::SingleFrench);
        assert_eq!(score_track(&Track::new(1, "fra", ""), &rule), 180);
        assert_eq!(score_track(&Track::new(2, "fra", "VFQ"), &rule), 100);
        assert_eq!(score_track(&Track::new(3, "fra", "AD"), &rule), 20);
        assert_eq!(score_track(&Track::new(4, "eng", "Stereo"), &rule), 20);
        assert_eq!(score_track(&Track::new(5, "", ""), &rule), 60);
        assert_eq!(
            score_track(&Track::new(6, "fre", "VFF").with_default(true), &rule),
            190
        );
    }

    #[test]
    fn equal_scores_keep_scan_order() {
        let descriptor = audio(vec![
            Track::new(1, "eng", "Stereo"),
            Track::new(2, "fra", ""),
            Track::new(3, "jpn", "Stereo"),
        ]);
        let scored = score_audio_tracks(&descriptor, &rule(AudioMode::MultiAllLanguages));
        let order: Vec<u32> = scored.iter().map(|s| s.track.track_number).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn single_track_shortcut_ignores_language() {
        let descriptor = audio(vec![Track::new(4, "jpn", "Audio Description")]);
        let selection = select_audio(&descriptor, &rule(AudioMode::SingleFrench)).unwrap();
        assert_eq!(selection.tracks, vec![4]);

        let selection = select_audio(&descriptor, &rule(AudioMode::VoLimited)).unwrap();
        assert_eq!(selection.tracks, vec![4]);
    }

    #[test]
    fn single_track_is_not_enough_for_multi() {
        let descriptor = audio(vec![Track::new(1, "fra", "")]);
        let err = select_audio(&descriptor, &rule(AudioMode::MultiAllLanguages)).unwrap_err();
        assert_eq!(err, SelectionError::InsufficientMultiTracks { found: 1 });
    }

    #[test]
    fn excluded_french_track_is_never_a_fallback() {
        let descriptor = audio(vec![
            Track::new(1, "fra", "VFQ"),
            Track::new(2, "eng", ""),
        ]);
        let err = select_audio(&descriptor, &rule(AudioMode::SingleFrench)).unwrap_err();
        assert_eq!(err, SelectionError::NoFrenchAudio);
    }

    #[test]
    fn accented_exclusion_keywords_match() {
        let descriptor = audio(vec![
            Track::new(1, "fra", "Français (Québec)"),
            Track::new(2, "fra", "Français"),
        ]);
        let selection = select_audio(&descriptor, &rule(AudioMode::SingleFrench)).unwrap();
        assert_eq!(selection.tracks, vec![2]);
    }

    #[test]
    fn multi_keeps_one_track_per_language_french_first() {
        let descriptor = audio(vec![
            Track::new(1, "jpn", "").with_default(true),
            Track::new(2, "eng", ""),
            Track::new(3, "fra", "VFF"),
            Track::new(4, "fra", ""),
        ]);
        let selection = select_audio(&descriptor, &rule(AudioMode::MultiAllLanguages)).unwrap();
        assert_eq!(selection.tracks, vec![3, 1, 2]);
    }

    #[test]
    fn multi_without_french_fails() {
        let descriptor = audio(vec![Track::new(1, "jpn", ""), Track::new(2, "eng", "")]);
        let err = select_audio(&descriptor, &rule(AudioMode::MultiAllLanguages)).unwrap_err();
        assert_eq!(err, SelectionError::NoFrenchAudio);
    }

    #[test]
    fn vo_rejects_ambiguous_candidates() {
        let descriptor = audio(vec![Track::new(1, "jpn", ""), Track::new(2, "eng", "")]);
        let err = select_audio(&descriptor, &rule(AudioMode::VoLimited)).unwrap_err();
        assert_eq!(err, SelectionError::TooManyValidTracks { count: 2 });
    }

    #[test]
    fn vo_with_only_excluded_tracks_has_no_audio() {
        let descriptor = audio(vec![
            Track::new(1, "jpn", "Audio Description"),
            Track::new(2, "eng", "Descriptive"),
        ]);
        let err = select_audio(&descriptor, &rule(AudioMode::VoLimited)).unwrap_err();
        assert_eq!(err, SelectionError::NoAudioTracks);
    }

    #[test]
    fn bounds_are_enforced() {
        let descriptor = audio(vec![
            Track::new(1, "fra", ""),
            Track::new(2, "eng", ""),
            Track::new(3, "jpn", ""),
        ]);
        let rule = rule(AudioMode::MultiAllLanguages).with_audio_bounds(None, Some(2));
        let err = select_audio(&descriptor, &rule).unwrap_err();
        assert_eq!(
            err,
            SelectionError::TrackCountOutOfBounds {
                count: 3,
                min: None,
                max: Some(2)
            }
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let descriptor = audio(vec![
            Track::new(1, "fra", "VFQ"),
            Track::new(2, "fra", "VFF"),
            Track::new(3, "eng", ""),
        ]);
        let rule = rule(AudioMode::MultiAllLanguages);
        let first = select_audio(&descriptor, &rule);
        for _ in 0..5 {
            assert_eq!(select_audio(&descriptor, &rule), first);
        }
    }
}
