use super::{AudioMode, PresetRule, SubtitleMode, SubtitleStrategy};

/// Stock presets matching the HandBrake preset export shipped with the pipeline.
pub(super) fn rules() -> Vec<PresetRule> {
    vec![
        PresetRule::new(
            "Dessins animes FR 1000kbps",
            AudioMode::SingleFrench,
            SubtitleMode::FrenchOnlyWithBurn,
        ),
        PresetRule::new(
            "1080p HD-Light 1500kbps",
            AudioMode::SingleFrench,
            SubtitleMode::FrenchOnlyWithBurn,
        ),
        PresetRule::new(
            "Mangas MULTI 1000kbps",
            AudioMode::MultiAllLanguages,
            SubtitleMode::FrenchOnlyWithBurn,
        ),
        PresetRule::new(
            "Mangas VO 1000kbps",
            AudioMode::VoLimited,
            SubtitleMode::BurnVerbalVo,
        )
        .with_strategy(SubtitleStrategy::Analyzer),
    ]
}
