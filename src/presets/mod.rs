//! Preset policy table: preset name -> track-selection rules.

mod builtin;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::model::PresetConfig;
use crate::error::ConfigError;

/// How audio tracks are chosen for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Exactly one French track.
    SingleFrench,
    /// One track per distinct language, French first.
    MultiAllLanguages,
    /// Exactly one original-language track.
    VoLimited,
}

/// How subtitle tracks are chosen for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleMode {
    /// Keep French subtitles, burn the forced one.
    FrenchOnlyWithBurn,
    /// Keep and burn a single full French track.
    BurnVerbalVo,
    /// No subtitles.
    None,
}

/// Which subtitle algorithm implements the [`SubtitleMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleStrategy {
    /// Language code + name keywords.
    #[default]
    Keyword,
    /// Verbal/non-verbal classification with regional ranking.
    Analyzer,
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleFrench => write!(f, "single_french"),
            Self::MultiAllLanguages => write!(f, "multi_all_languages"),
            Self::VoLimited => write!(f, "vo_limited"),
        }
    }
}

impl std::fmt::Display for SubtitleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrenchOnlyWithBurn => write!(f, "french_only_with_burn"),
            Self::BurnVerbalVo => write!(f, "burn_verbal_vo"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Marker lists feeding the audio scoring table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioScoring {
    /// Names marking a France-French dub.
    #[serde(default = "default_french_markers")]
    pub french_markers: Vec<String>,

    /// Names marking a Québec/Canadian dub.
    #[serde(default = "default_regional_markers")]
    pub regional_markers: Vec<String>,

    /// Names marking descriptive audio or hearing-impaired mixes.
    #[serde(default = "default_accessibility_markers")]
    pub accessibility_markers: Vec<String>,
}

impl Default for AudioScoring {
    fn default() -> Self {
        Self {
            french_markers: default_french_markers(),
            regional_markers: default_regional_markers(),
            accessibility_markers: default_accessibility_markers(),
        }
    }
}

/// Track-selection rules of one preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetRule {
    pub name: String,
    pub audio_mode: AudioMode,
    pub min_audio_tracks: Option<usize>,
    pub max_audio_tracks: Option<usize>,
    pub subtitle_mode: SubtitleMode,
    pub subtitle_strategy: SubtitleStrategy,
    pub audio_exclusion_keywords: Vec<String>,
    pub subtitle_exclusion_keywords: Vec<String>,
    pub burn_keywords: Vec<String>,
    pub french_codes: Vec<String>,
    pub scoring: AudioScoring,
}

impl PresetRule {
    /// Creates a rule with the stock keyword lists.
    pub fn new(
        name: impl Into<String>,
        audio_mode: AudioMode,
        subtitle_mode: SubtitleMode,
    ) -> Self {
        Self {
            name: name.into(),
            audio_mode,
            min_audio_tracks: None,
            max_audio_tracks: None,
            subtitle_mode,
            subtitle_strategy: SubtitleStrategy::default(),
            audio_exclusion_keywords: default_audio_exclusion_keywords(),
            subtitle_exclusion_keywords: default_subtitle_exclusion_keywords(),
            burn_keywords: default_burn_keywords(),
            french_codes: default_french_codes(),
            scoring: AudioScoring::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: SubtitleStrategy) -> Self {
        self.subtitle_strategy = strategy;
        self
    }

    pub fn with_audio_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_audio_tracks = min;
        self.max_audio_tracks = max;
        self
    }

    /// Returns true if `code` is one of this preset's French language codes.
    pub fn is_french_code(&self, code: &str) -> bool {
        let code = code.trim();
        self.french_codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}

impl From<&PresetConfig> for PresetRule {
    fn from(config: &PresetConfig) -> Self {
        Self {
            name: config.name.clone(),
            audio_mode: config.audio_mode,
            min_audio_tracks: config.min_audio_tracks,
            max_audio_tracks: config.max_audio_tracks,
            subtitle_mode: config.subtitle_mode,
            subtitle_strategy: config.subtitle_strategy,
            audio_exclusion_keywords: config.audio_exclusion_keywords.clone(),
            subtitle_exclusion_keywords: config.subtitle_exclusion_keywords.clone(),
            burn_keywords: config.burn_keywords.clone(),
            french_codes: config.french_codes.clone(),
            scoring: config.scoring.clone(),
        }
    }
}

/// Lookup table of every preset known to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    rules: BTreeMap<String, PresetRule>,
}

impl PresetTable {
    /// Builds the table from configured presets. Duplicate names are rejected.
    pub fn from_config(presets: &[PresetConfig]) -> Result<Self, ConfigError> {
        let mut rules = BTreeMap::new();

        for preset in presets {
            let rule = PresetRule::from(preset);
            if rules.insert(rule.name.clone(), rule).is_some() {
                return Err(ConfigError::DuplicatePreset {
                    name: preset.name.clone(),
                });
            }
        }

        Ok(Self { rules })
    }

    /// The stock presets shipped with the pipeline.
    pub fn builtin() -> Self {
        let rules = builtin::rules()
            .into_iter()
            .map(|rule| (rule.name.clone(), rule))
            .collect();
        Self { rules }
    }

    /// Uses the configured presets, or the stock ones when none are configured.
    pub fn from_config_or_builtin(presets: &[PresetConfig]) -> Result<Self, ConfigError> {
        if presets.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::from_config(presets)
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Result<&PresetRule, ConfigError> {
        self.rules.get(name).ok_or_else(|| ConfigError::UnknownPreset {
            name: name.to_string(),
            suggestion: self.suggest(name),
        })
    }

    /// Closest known preset name, if any is reasonably close.
    pub fn suggest(&self, name: &str) -> Option<String> {
        suggest_name(name, self.names())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn rules(&self) -> impl Iterator<Item = &PresetRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Finds the candidate closest to `input` by Levenshtein distance on lower-cased text.
///
/// Returns `None` when the best candidate needs more edits than half its length.
pub fn suggest_name<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let input_lower = input.to_lowercase();

    candidates
        .map(|c| (strsim::levenshtein(&input_lower, &c.to_lowercase()), c))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, candidate)| *distance <= candidate.chars().count() / 2)
        .map(|(_, candidate)| candidate.to_string())
}

pub(crate) fn default_audio_exclusion_keywords() -> Vec<String> {
    to_strings(&["vfq", "ad", "audiodescription", "quebec", "descriptive"])
}

pub(crate) fn default_subtitle_exclusion_keywords() -> Vec<String> {
    to_strings(&["sdh", "malentendant", "vfq"])
}

pub(crate) fn default_burn_keywords() -> Vec<String> {
    to_strings(&["force"])
}

pub(crate) fn default_french_codes() -> Vec<String> {
    to_strings(&["fra", "fre", "fr", "french"])
}

fn default_french_markers() -> Vec<String> {
    to_strings(&["vff", "fr"])
}

fn default_regional_markers() -> Vec<String> {
    to_strings(&["vfq", "cana", "queb"])
}

fn default_accessibility_markers() -> Vec<String> {
    to_strings(&["malentendant", "sdh", "descriptive", "audio description", "ad"])
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
