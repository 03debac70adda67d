//! Semantic validation for configuration values.

use std::collections::HashSet;

use crate::config::model::{AppConfig, GlobalConfig, PresetConfig};
use crate::media::normalize::{is_normalized, normalize};
use crate::presets::{suggest_name, PresetTable};

use super::{ValidationIssue, ValidationResult};

/// Validates semantic correctness of configuration values.
pub fn validate(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_global(&config.global, &mut result);

    let mut seen_presets = HashSet::new();
    for (i, preset) in config.presets.iter().enumerate() {
        let prefix = format!("presets[{}]", i);

        if !seen_presets.insert(preset.name.as_str()) {
            result.add(ValidationIssue::error(
                format!("{}.name", prefix),
                format!("Duplicate preset name: '{}'", preset.name),
            ));
        }

        validate_preset(preset, &prefix, &mut result);
    }

    validate_watch_folders(config, &mut result);

    result
}

/// Validates global configuration settings.
fn validate_global(global: &GlobalConfig, result: &mut ValidationResult) {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&global.log_level.as_str()) {
        let mut issue = ValidationIssue::error(
            "global.log_level",
            format!("Invalid log level: '{}'", global.log_level),
        );
        issue = match suggest_name(&global.log_level, valid_levels.into_iter()) {
            Some(level) => issue.with_suggestion(format!("Did you mean '{}'?", level)),
            None => issue.with_suggestion(format!("Valid levels: {}", valid_levels.join(", "))),
        };
        result.add(issue);
    }

    if global.stability_check.duration_seconds == 0 {
        result.add(ValidationIssue::error(
            "global.stability_check.duration_seconds",
            "Stability duration must be at least 1 second",
        ));
    }

    if global.stability_check.poll_interval_seconds == 0 {
        result.add(ValidationIssue::error(
            "global.stability_check.poll_interval_seconds",
            "Poll interval must be at least 1 second",
        ));
    }

    if let Some(discord) = &global.notifications.discord {
        if !discord.webhook_url.starts_with("https://") {
            result.add(
                ValidationIssue::error(
                    "global.notifications.discord.webhook_url",
                    "Discord webhook URL must use https",
                )
                .with_suggestion(
                    "Copy the URL from Discord: Server Settings > Integrations > Webhooks",
                ),
            );
        }
    }
}

/// Validates one preset's bounds and keyword lists.
fn validate_preset(preset: &PresetConfig, prefix: &str, result: &mut ValidationResult) {
    if preset.max_audio_tracks == Some(0) {
        result.add(ValidationIssue::error(
            format!("{}.max_audio_tracks", prefix),
            "max_audio_tracks must be at least 1",
        ));
    }

    if let (Some(min), Some(max)) = (preset.min_audio_tracks, preset.max_audio_tracks) {
        if min > max {
            result.add(ValidationIssue::error(
                format!("{}.min_audio_tracks", prefix),
                format!("min_audio_tracks ({}) is greater than max_audio_tracks ({})", min, max),
            ));
        }
    }

    let keyword_lists: [(&str, &[String]); 7] = [
        ("audio_exclusion_keywords", preset.audio_exclusion_keywords.as_slice()),
        ("subtitle_exclusion_keywords", preset.subtitle_exclusion_keywords.as_slice()),
        ("burn_keywords", preset.burn_keywords.as_slice()),
        ("french_codes", preset.french_codes.as_slice()),
        ("scoring.french_markers", preset.scoring.french_markers.as_slice()),
        ("scoring.regional_markers", preset.scoring.regional_markers.as_slice()),
        ("scoring.accessibility_markers", preset.scoring.accessibility_markers.as_slice()),
    ];

    for (field, keywords) in keyword_lists {
        for (j, keyword) in keywords.iter().enumerate() {
            let path = format!("{}.{}[{}]", prefix, field, j);

            if keyword.trim().is_empty() {
                result.add(ValidationIssue::warning(path, "Empty keyword never matches"));
            } else if !is_normalized(keyword) {
                result.add(
                    ValidationIssue::warning(
                        path,
                        format!(
                            "Keyword '{}' contains accents or capitals and will never match",
                            keyword
                        ),
                    )
                    .with_suggestion(format!("Use '{}'", normalize(keyword))),
                );
            }
        }
    }
}

/// Validates watch folder bindings: presets must resolve, inputs must be unique.
fn validate_watch_folders(config: &AppConfig, result: &mut ValidationResult) {
    // Duplicate names are reported above; resolve against whatever table can be built.
    let table = PresetTable::from_config_or_builtin(&config.presets).ok();
    let names: Vec<&str> = config.presets.iter().map(|p| p.name.as_str()).collect();

    let mut seen_paths = HashSet::new();

    for (i, folder) in config.watch_folders.iter().enumerate() {
        let prefix = format!("watch_folders[{}]", i);

        let known = match &table {
            Some(table) => table.resolve(&folder.preset).is_ok(),
            None => names.contains(&folder.preset.as_str()),
        };

        if !known && !folder.preset.trim().is_empty() {
            let suggestion = match &table {
                Some(table) => table.suggest(&folder.preset),
                None => suggest_name(&folder.preset, names.iter().copied()),
            };

            let mut issue = ValidationIssue::error(
                format!("{}.preset", prefix),
                format!("Unknown preset: '{}'", folder.preset),
            );
            if let Some(name) = suggestion {
                issue = issue.with_suggestion(format!("Did you mean '{}'?", name));
            }
            result.add(issue);
        }

        let input_str = folder.path.to_string_lossy().to_string();
        if !seen_paths.insert(input_str.clone()) {
            result.add(ValidationIssue::error(
                format!("{}.path", prefix),
                format!("Duplicate watch folder: '{}'", input_str),
            ));
        }
    }
}
