//! Subtitle track selection: which French subtitles to keep and which one to burn in.

use serde::Serialize;
use tracing::debug;

use crate::error::SelectionError;
use crate::presets::{PresetRule, SubtitleMode, SubtitleStrategy};

use super::analyzer::analyze_subtitles;
use super::normalize::{contains_any, normalize};
use super::track::{Track, TrackDescriptor};

/// Kept subtitle tracks (scan order) and the optional burn-in track.
///
/// `burn`, when set, is always one of `tracks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubtitleSelection {
    pub tracks: Vec<u32>,
    pub burn: Option<u32>,
}

impl SubtitleSelection {
    pub fn none() -> Self {
        Self::default()
    }

    fn new(tracks: Vec<u32>, burn: Option<u32>) -> Self {
        debug_assert!(burn.map_or(true, |b| tracks.contains(&b)));
        Self { tracks, burn }
    }

    /// 1-based position of the burn track within `tracks`.
    pub fn burn_position(&self) -> Option<usize> {
        let burn = self.burn?;
        self.tracks.iter().position(|&t| t == burn).map(|i| i + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Chooses the subtitle tracks to keep for `rule`.
pub fn select_subtitles(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<SubtitleSelection, SelectionError> {
    match (rule.subtitle_mode, rule.subtitle_strategy) {
        (SubtitleMode::None, _) => Ok(SubtitleSelection::none()),
        (SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword) => {
            french_with_burn_by_keyword(descriptor, rule)
        }
        (SubtitleMode::BurnVerbalVo, SubtitleStrategy::Keyword) => {
            verbal_vo_by_keyword(descriptor, rule)
        }
        (SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Analyzer) => {
            french_with_burn_by_analysis(descriptor, rule)
        }
        (SubtitleMode::BurnVerbalVo, SubtitleStrategy::Analyzer) => {
            verbal_vo_by_analysis(descriptor, rule)
        }
    }
}

fn french_tracks<'a>(
    descriptor: &'a TrackDescriptor,
    rule: &'a PresetRule,
) -> impl Iterator<Item = &'a Track> {
    descriptor
        .subtitle_tracks
        .iter()
        .filter(|t| rule.is_french_code(&t.language_code))
}

fn french_with_burn_by_keyword(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<SubtitleSelection, SelectionError> {
    let kept: Vec<(&Track, String)> = french_tracks(descriptor, rule)
        .map(|t| (t, normalize(&t.name)))
        .filter(|(t, name)| {
            let excluded = !name.trim().is_empty()
                && contains_any(name, &rule.subtitle_exclusion_keywords);
            if excluded {
                debug!(track = t.track_number, name = %t.name, "Dropping excluded subtitle track");
            }
            !excluded
        })
        .collect();

    if kept.is_empty() {
        return Err(SelectionError::NoFrenchSubtitles);
    }

    let burn = kept
        .iter()
        .find(|(_, name)| contains_any(name, &rule.burn_keywords))
        .map(|(t, _)| t.track_number);

    let allowed = if burn.is_some() { 2 } else { 1 };
    if kept.len() > allowed {
        return Err(SelectionError::TooManySubtitles {
            kept: kept.len(),
            allowed,
        });
    }

    Ok(SubtitleSelection::new(
        kept.iter().map(|(t, _)| t.track_number).collect(),
        burn,
    ))
}

fn verbal_vo_by_keyword(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<SubtitleSelection, SelectionError> {
    let first = french_tracks(descriptor, rule)
        .next()
        .ok_or(SelectionError::NoFrenchSubtitles)?;

    Ok(SubtitleSelection::new(vec![first.track_number], Some(first.track_number)))
}

fn french_with_burn_by_analysis(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<SubtitleSelection, SelectionError> {
    let analysis = analyze_subtitles(descriptor, rule);
    let verbal = analysis.recommended_verbal;
    let non_verbal = analysis.recommended_non_verbal;

    if verbal.is_none() && non_verbal.is_none() {
        return Err(SelectionError::NoFrenchSubtitles);
    }

    let tracks = descriptor
        .subtitle_tracks
        .iter()
        .map(|t| t.track_number)
        .filter(|n| Some(*n) == verbal || Some(*n) == non_verbal)
        .collect();

    Ok(SubtitleSelection::new(tracks, non_verbal))
}

fn verbal_vo_by_analysis(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<SubtitleSelection, SelectionError> {
    let analysis = analyze_subtitles(descriptor, rule);
    let verbal = analysis
        .recommended_verbal
        .ok_or(SelectionError::NoFrenchSubtitles)?;

    Ok(SubtitleSelection::new(vec![verbal], Some(verbal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::track::SubtitleMetrics;
    use crate::presets::AudioMode;

    fn rule(mode: SubtitleMode, strategy: SubtitleStrategy) -> PresetRule {
        PresetRule::new("test", AudioMode::SingleFrench, mode).with_strategy(strategy)
    }

    fn subs(tracks: Vec<Track>) -> TrackDescriptor {
        TrackDescriptor::new(vec![], tracks)
    }

    #[test]
    fn none_mode_keeps_nothing() {
        let descriptor = subs(vec![Track::new(1, "fra", "Full")]);
        for strategy in [SubtitleStrategy::Keyword, SubtitleStrategy::Analyzer] {
            let selection =
                select_subtitles(&descriptor, &rule(SubtitleMode::None, strategy)).unwrap();
            assert!(selection.is_empty());
            assert_eq!(selection.burn_position(), None);
        }
    }

    #[test]
    fn forced_and_full_french_are_kept() {
        let descriptor = subs(vec![
            Track::new(1, "fra", "Forced"),
            Track::new(2, "eng", "Forced"),
            Track::new(3, "fra", "Full"),
        ]);
        let selection = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword),
        )
        .unwrap();
        assert_eq!(selection.tracks, vec![1, 3]);
        assert_eq!(selection.burn, Some(1));
        assert_eq!(selection.burn_position(), Some(1));
    }

    #[test]
    fn exclusion_keywords_drop_named_tracks_only() {
        let descriptor = subs(vec![
            Track::new(1, "fra", "SDH"),
            Track::new(2, "fra", ""),
            Track::new(3, "fra", "Forcés"),
        ]);
        let selection = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword),
        )
        .unwrap();
        assert_eq!(selection.tracks, vec![2, 3]);
        assert_eq!(selection.burn_position(), Some(2));
    }

    #[test]
    fn two_full_tracks_without_burn_are_ambiguous() {
        let descriptor = subs(vec![Track::new(1, "fra", "Full"), Track::new(2, "fre", "Complet")]);
        let err = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::TooManySubtitles { kept: 2, allowed: 1 });
    }

    #[test]
    fn three_tracks_with_burn_are_too_many() {
        let descriptor = subs(vec![
            Track::new(1, "fra", "Forced"),
            Track::new(2, "fra", "Full"),
            Track::new(3, "fra", "Commentaire"),
        ]);
        let err = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::TooManySubtitles { kept: 3, allowed: 2 });
    }

    #[test]
    fn no_french_subtitles_is_an_error() {
        let descriptor = subs(vec![Track::new(1, "eng", "Full")]);
        let err = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Keyword),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::NoFrenchSubtitles);
    }

    #[test]
    fn vo_burns_first_french_track() {
        let descriptor = subs(vec![
            Track::new(1, "eng", "Full"),
            Track::new(2, "fra", "Full"),
            Track::new(3, "fra", "Forced"),
        ]);
        let selection = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::BurnVerbalVo, SubtitleStrategy::Keyword),
        )
        .unwrap();
        assert_eq!(selection.tracks, vec![2]);
        assert_eq!(selection.burn, Some(2));
    }

    #[test]
    fn analyzer_keeps_verbal_and_burns_non_verbal() {
        let descriptor = subs(vec![
            Track::new(1, "fra", "Full").with_metrics(SubtitleMetrics {
                element_count: 850,
                stream_size: 48_000,
                duration_secs: 5400.0,
            }),
            Track::new(2, "fra", "Signs").with_metrics(SubtitleMetrics {
                element_count: 8,
                stream_size: 400,
                duration_secs: 5400.0,
            }),
            Track::new(3, "fra", "SDH").with_metrics(SubtitleMetrics {
                element_count: 900,
                stream_size: 52_000,
                duration_secs: 5400.0,
            }),
        ]);
        let selection = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::FrenchOnlyWithBurn, SubtitleStrategy::Analyzer),
        )
        .unwrap();
        assert_eq!(selection.tracks, vec![1, 2]);
        assert_eq!(selection.burn, Some(2));
        assert_eq!(selection.burn_position(), Some(2));
    }

    #[test]
    fn analyzer_vo_burns_recommended_verbal() {
        let descriptor = subs(vec![
            Track::new(1, "fra", "Forced").with_forced(true),
            Track::new(2, "fra", "Québec"),
            Track::new(3, "fra", "VFF"),
        ]);
        let selection = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::BurnVerbalVo, SubtitleStrategy::Analyzer),
        )
        .unwrap();
        assert_eq!(selection.tracks, vec![3]);
        assert_eq!(selection.burn, Some(3));
    }

    #[test]
    fn analyzer_vo_without_verbal_track_fails() {
        let descriptor = subs(vec![Track::new(1, "fra", "Forced").with_forced(true)]);
        let err = select_subtitles(
            &descriptor,
            &rule(SubtitleMode::BurnVerbalVo, SubtitleStrategy::Analyzer),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::NoFrenchSubtitles);
    }
}
