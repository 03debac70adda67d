//! End-to-end track selection against the stock presets.

use vf_encode_pipeline::error::SelectionError;
use vf_encode_pipeline::media::normalize::normalize;
use vf_encode_pipeline::media::{
    select_audio, select_subtitles, select_tracks, Track, TrackDescriptor,
};
use vf_encode_pipeline::presets::{PresetRule, PresetTable};

const SINGLE_FRENCH: &str = "1080p HD-Light 1500kbps";
const MULTI: &str = "Mangas MULTI 1000kbps";
const VO: &str = "Mangas VO 1000kbps";

fn preset(name: &str) -> PresetRule {
    PresetTable::builtin().resolve(name).unwrap().clone()
}

fn audio(tracks: Vec<Track>) -> TrackDescriptor {
    TrackDescriptor::new(tracks, Vec::new())
}

#[test]
fn french_track_is_picked_over_english() {
    let descriptor = audio(vec![Track::new(1, "fra", "Full"), Track::new(2, "eng", "Full")]);
    let selection = select_audio(&descriptor, &preset(SINGLE_FRENCH)).unwrap();
    assert_eq!(selection.tracks, vec![1]);
}

#[test]
fn unnamed_french_track_beats_quebec_and_descriptive() {
    let descriptor = audio(vec![
        Track::new(1, "fra", ""),
        Track::new(2, "fra", "VFQ"),
        Track::new(3, "fra", "AD"),
    ]);
    let selection = select_audio(&descriptor, &preset(SINGLE_FRENCH)).unwrap();
    assert_eq!(selection.tracks, vec![1]);
}

#[test]
fn no_audio_fails_in_every_mode() {
    let descriptor = audio(Vec::new());
    for name in [SINGLE_FRENCH, MULTI, VO] {
        assert_eq!(
            select_audio(&descriptor, &preset(name)).unwrap_err(),
            SelectionError::NoAudioTracks,
            "preset {}",
            name
        );
    }
}

#[test]
fn multi_keeps_french_first() {
    let descriptor = audio(vec![Track::new(1, "fra", ""), Track::new(2, "eng", "")]);
    let selection = select_audio(&descriptor, &preset(MULTI)).unwrap();
    assert_eq!(selection.tracks, vec![1, 2]);

    let reversed = audio(vec![Track::new(1, "eng", ""), Track::new(2, "fra", "")]);
    let selection = select_audio(&reversed, &preset(MULTI)).unwrap();
    assert_eq!(selection.tracks[0], 2);
}

#[test]
fn multi_needs_two_languages() {
    let descriptor = audio(vec![Track::new(1, "fra", "VFF"), Track::new(2, "fra", "VFQ")]);
    let err = select_audio(&descriptor, &preset(MULTI)).unwrap_err();
    assert!(matches!(err, SelectionError::InsufficientMultiTracks { .. }));
}

#[test]
fn forced_french_subtitle_is_burned() {
    let descriptor = TrackDescriptor::new(
        Vec::new(),
        vec![
            Track::new(1, "fra", "Forced"),
            Track::new(2, "eng", "Forced"),
            Track::new(3, "fra", "Full"),
        ],
    );
    let selection = select_subtitles(&descriptor, &preset(SINGLE_FRENCH)).unwrap();
    assert_eq!(selection.tracks, vec![1, 3]);
    assert_eq!(selection.burn, Some(1));
    assert_eq!(selection.burn_position(), Some(1));
}

#[test]
fn vo_without_french_subtitles_fails() {
    let descriptor = TrackDescriptor::new(
        vec![Track::new(1, "jpn", "")],
        vec![Track::new(1, "eng", "Full"), Track::new(2, "spa", "")],
    );
    let err = select_subtitles(&descriptor, &preset(VO)).unwrap_err();
    assert_eq!(err, SelectionError::NoFrenchSubtitles);
}

#[test]
fn burn_position_counts_within_kept_list() {
    let descriptor = TrackDescriptor::new(
        vec![Track::new(1, "fra", "VFF"), Track::new(2, "eng", "")],
        vec![
            Track::new(1, "eng", "Full"),
            Track::new(2, "fra", "Complets"),
            Track::new(3, "fra", "Forcés"),
        ],
    );
    let options = select_tracks(&descriptor, &preset(SINGLE_FRENCH)).unwrap();
    assert_eq!(
        options.to_args(),
        vec!["--audio=1", "--subtitle=2,3", "--subtitle-burned=2"]
    );
}

#[test]
fn burned_track_is_always_kept() {
    let cases = vec![
        vec![Track::new(1, "fra", "Forced")],
        vec![Track::new(1, "fra", "Full"), Track::new(2, "fre", "forcé")],
        vec![Track::new(4, "fr", "")],
    ];
    for subtitles in cases {
        let descriptor = TrackDescriptor::new(Vec::new(), subtitles);
        for name in [SINGLE_FRENCH, VO] {
            if let Ok(selection) = select_subtitles(&descriptor, &preset(name)) {
                if let Some(burn) = selection.burn {
                    assert!(selection.tracks.contains(&burn));
                }
            }
        }
    }
}

#[test]
fn normalization_is_idempotent() {
    for input in ["Forcés", "  Français (VFQ)  ", "SDH", "Audiodescription ", ""] {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }
}
