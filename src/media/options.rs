//! Renders track selections as HandBrakeCLI option values.

use serde::Serialize;

use crate::error::SelectionError;
use crate::presets::PresetRule;

use super::audio::{select_audio, AudioSelection};
use super::subtitle::{select_subtitles, SubtitleSelection};
use super::track::TrackDescriptor;

/// Audio and subtitle selections for one file, ready to hand to the transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeOptions {
    pub audio: AudioSelection,
    pub subtitles: SubtitleSelection,
}

impl EncodeOptions {
    pub fn new(audio: &AudioSelection, subtitles: &SubtitleSelection) -> Self {
        Self {
            audio: audio.clone(),
            subtitles: subtitles.clone(),
        }
    }

    /// `--audio=1,2`
    pub fn audio_arg(&self) -> String {
        format!("--audio={}", join(&self.audio.tracks))
    }

    /// `--subtitle=3,4`, or `--subtitle=none` when nothing is kept.
    pub fn subtitle_arg(&self) -> String {
        if self.subtitles.is_empty() {
            "--subtitle=none".to_string()
        } else {
            format!("--subtitle={}", join(&self.subtitles.tracks))
        }
    }

    /// `--subtitle-burned=N` where N is the burn track's position in the kept list.
    pub fn burn_arg(&self) -> Option<String> {
        self.subtitles
            .burn_position()
            .map(|position| format!("--subtitle-burned={}", position))
    }

    /// All track arguments in command-line order.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.audio_arg(), self.subtitle_arg()];
        args.extend(self.burn_arg());
        args
    }
}

impl std::fmt::Display for EncodeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

/// Runs both selectors for `rule` and combines the result.
pub fn select_tracks(
    descriptor: &TrackDescriptor,
    rule: &PresetRule,
) -> Result<EncodeOptions, SelectionError> {
    let audio = select_audio(descriptor, rule)?;
    let subtitles = select_subtitles(descriptor, rule)?;
    Ok(EncodeOptions::new(&audio, &subtitles))
}

fn join(tracks: &[u32]) -> String {
    tracks
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::track::Track;
    use crate::presets::{AudioMode, SubtitleMode};

    #[test]
    fn renders_burn_position_not_track_number() {
        let options = EncodeOptions::new(
            &AudioSelection { tracks: vec![2, 1] },
            &SubtitleSelection {
                tracks: vec![3, 5],
                burn: Some(5),
            },
        );
        assert_eq!(
            options.to_args(),
            vec!["--audio=2,1", "--subtitle=3,5", "--subtitle-burned=2"]
        );
    }

    #[test]
    fn empty_subtitles_render_none() {
        let audio = AudioSelection { tracks: vec![1] };
        let options = EncodeOptions::new(&audio, &SubtitleSelection::none());
        assert_eq!(options.to_string(), "--audio=1 --subtitle=none");
    }

    #[test]
    fn select_tracks_combines_both_selectors() {
        let descriptor = TrackDescriptor::new(
            vec![Track::new(1, "fra", ""), Track::new(2, "eng", "")],
            vec![Track::new(1, "fra", "Forced"), Track::new(2, "fra", "")],
        );
        let rule = PresetRule::new(
            "Films",
            AudioMode::SingleFrench,
            SubtitleMode::FrenchOnlyWithBurn,
        );
        let options = select_tracks(&descriptor, &rule).unwrap();
        assert_eq!(options.to_string(), "--audio=1 --subtitle=1,2 --subtitle-burned=1");
    }

    #[test]
    fn audio_failure_short_circuits() {
        let descriptor = TrackDescriptor::new(vec![], vec![Track::new(1, "fra", "")]);
        let rule = PresetRule::new(
            "Films",
            AudioMode::SingleFrench,
            SubtitleMode::FrenchOnlyWithBurn,
        );
        assert_eq!(select_tracks(&descriptor, &rule), Err(SelectionError::NoAudioTracks));
    }
}
