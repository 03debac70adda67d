//! Schema validation for configuration structure.

use crate::config::model::AppConfig;
use super::{ValidationIssue, ValidationResult};

/// Validates the configuration schema (required fields, structure).
pub fn validate(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if config.global.output_dir.as_os_str().is_empty() {
        result.add(ValidationIssue::error(
            "global.output_dir",
            "Output directory is required",
        ));
    }

    if config.global.handbrake.path.as_os_str().is_empty() {
        result.add(ValidationIssue::error(
            "global.handbrake.path",
            "HandBrakeCLI path cannot be empty",
        ));
    }

    if config.watch_folders.is_empty() {
        result.add(
            ValidationIssue::warning(
                "watch_folders",
                "No watch folders defined, nothing will be encoded",
            )
            .with_suggestion("Add a watch folder with a path and a preset"),
        );
    }

    for (i, folder) in config.watch_folders.iter().enumerate() {
        let prefix = format!("watch_folders[{}]", i);

        if folder.path.as_os_str().is_empty() {
            result.add(ValidationIssue::error(
                format!("{}.path", prefix),
                "Watch folder path is required",
            ));
        }

        if folder.preset.trim().is_empty() {
            result.add(ValidationIssue::error(
                format!("{}.preset", prefix),
                "Watch folder preset is required",
            ));
        }

        if folder.file_patterns.is_empty() {
            result.add(
                ValidationIssue::error(
                    format!("{}.file_patterns", prefix),
                    "At least one file pattern is required",
                )
                .with_suggestion("For example: [\"*.mkv\", \"*.mp4\", \"*.avi\"]"),
            );
        }
    }

    for (i, preset) in config.presets.iter().enumerate() {
        let prefix = format!("presets[{}]", i);

        if preset.name.trim().is_empty() {
            result.add(ValidationIssue::error(
                format!("{}.name", prefix),
                "Preset name cannot be empty",
            ));
        }

        if preset.french_codes.is_empty() {
            result.add(
                ValidationIssue::error(
                    format!("{}.french_codes", prefix),
                    "At least one French language code is required",
                )
                .with_suggestion("HandBrake reports French as 'fra' or 'fre'"),
            );
        }
    }

    result
}
