//! Track metadata and the audio/subtitle selection engine.

pub mod analyzer;
pub mod audio;
pub mod mediainfo;
pub mod normalize;
pub mod options;
pub mod scan;
pub mod subtitle;
pub mod track;

pub use analyzer::{analyze_subtitles, SubtitleAnalysis};
pub use audio::{select_audio, AudioSelection};
pub use options::{select_tracks, EncodeOptions};
pub use scan::{HandBrakeScanner, TrackScanner};
pub use subtitle::{select_subtitles, SubtitleSelection};
pub use track::{SubtitleMetrics, Track, TrackDescriptor};
