//! Path validation for configuration directories.

use std::path::Path;

use crate::config::model::AppConfig;

use super::{ValidationIssue, ValidationResult};

/// Validates that all configured paths exist and are accessible.
pub fn validate(config: &AppConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_directory_writable(&config.global.output_dir, "global.output_dir", &mut result);
    validate_directory_writable(&config.global.state_dir, "global.state_dir", &mut result);

    if let Some(log_dir) = &config.global.log_dir {
        validate_directory_writable(log_dir, "global.log_dir", &mut result);
    }

    if let Some(presets_file) = &config.global.handbrake.presets_file {
        if !presets_file.is_file() {
            result.add(
                ValidationIssue::error(
                    "global.handbrake.presets_file",
                    format!("HandBrake presets file not found: '{}'", presets_file.display()),
                )
                .with_suggestion("Export your presets from HandBrake (Presets > Export)"),
            );
        }
    }

    // Track paths to check for overlaps
    let mut input_paths: Vec<(usize, &Path)> = Vec::new();

    for (i, folder) in config.watch_folders.iter().enumerate() {
        let prefix = format!("watch_folders[{}]", i);

        validate_directory_readable(&folder.path, &format!("{}.path", prefix), &mut result);

        let output = folder.output_path.as_deref().unwrap_or(&config.global.output_dir);
        if let Some(output_path) = &folder.output_path {
            let config_path = format!("{}.output_path", prefix);
            validate_directory_writable(output_path, &config_path, &mut result);
        }

        // Encoded files land next to the sources; the _encoded suffix keeps them out of the queue.
        if folder.path == output {
            result.add(
                ValidationIssue::warning(
                    format!("{}.output_path", prefix),
                    "Output directory is the watched directory",
                )
                .with_suggestion("Use a separate output directory"),
            );
        }

        input_paths.push((i, &folder.path));
    }

    validate_no_path_overlaps(&input_paths, config, &mut result);

    result
}

/// Validates that a directory exists and is readable.
fn validate_directory_readable(path: &Path, config_path: &str, result: &mut ValidationResult) {
    if !path.exists() {
        result.add(
            ValidationIssue::error(
                config_path,
                format!("Directory does not exist: '{}'", path.display()),
            )
            .with_suggestion("Create the directory or update the path"),
        );
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            config_path,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    if std::fs::read_dir(path).is_err() {
        result.add(
            ValidationIssue::error(
                config_path,
                format!("Directory is not readable: '{}'", path.display()),
            )
            .with_suggestion("Check directory permissions"),
        );
    }
}

/// Validates that a directory exists (creating it if needed) and is writable.
fn validate_directory_writable(path: &Path, config_path: &str, result: &mut ValidationResult) {
    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(path) {
            result.add(
                ValidationIssue::error(
                    config_path,
                    format!("Cannot create directory '{}': {}", path.display(), e),
                )
                .with_suggestion("Check parent directory permissions"),
            );
        }
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            config_path,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    let probe = path.join(".vf-encode-write-test");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
        }
        Err(e) => {
            result.add(
                ValidationIssue::error(
                    config_path,
                    format!("Directory is not writable '{}': {}", path.display(), e),
                )
                .with_suggestion("Check directory permissions"),
            );
        }
    }
}

/// Recursive watch folders must not contain another watch folder.
fn validate_no_path_overlaps(
    paths: &[(usize, &Path)],
    config: &AppConfig,
    result: &mut ValidationResult,
) {
    for (pos, (i, path_a)) in paths.iter().enumerate() {
        for (j, path_b) in paths.iter().skip(pos + 1) {
            if !paths_overlap(path_a, path_b) {
                continue;
            }

            let recursive =
                config.watch_folders[*i].recursive || config.watch_folders[*j].recursive;
            if recursive {
                result.add(
                    ValidationIssue::error(
                        format!("watch_folders[{}].path", i),
                        format!(
                            "Watch folders overlap: '{}' and '{}'",
                            path_a.display(),
                            path_b.display()
                        ),
                    )
                    .with_suggestion("Each watch folder should cover a distinct directory tree"),
                );
            }
        }
    }
}

/// Checks if two paths overlap (one is a parent/child of the other).
fn paths_overlap(path_a: &Path, path_b: &Path) -> bool {
    let canon_a = std::fs::canonicalize(path_a).unwrap_or_else(|_| path_a.to_path_buf());
    let canon_b = std::fs::canonicalize(path_b).unwrap_or_else(|_| path_b.to_path_buf());

    canon_a.starts_with(&canon_b) || canon_b.starts_with(&canon_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &Path, folders: &[(&str, bool)]) -> AppConfig {
        let mut yaml = format!(
            "global:\n  output_dir: {}\n  state_dir: {}\nwatch_folders:\n",
            root.join("out").display(),
            root.join("state").display()
        );
        for (folder, recursive) in folders {
            yaml.push_str(&format!(
                "  - path: {}\n    preset: Films\n    recursive: {}\n",
                root.join(folder).display(),
                recursive
            ));
        }
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn missing_watch_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(dir.path(), &[("missing", true)]);

        let result = validate(&config);
        assert!(result.has_issue_at("watch_folders[0].path"));
        // output and state directories are created on demand
        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("state").is_dir());
    }

    #[test]
    fn nested_recursive_folders_overlap() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("films/kids")).unwrap();

        let config = config_for(dir.path(), &[("films", true), ("films/kids", false)]);
        let result = validate(&config);
        assert_eq!(result.error_count(), 1);
        assert!(result.has_issue_at("watch_folders[0].path"));
    }

    #[test]
    fn sibling_folders_are_fine() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("films")).unwrap();
        std::fs::create_dir_all(dir.path().join("series")).unwrap();

        let config = config_for(dir.path(), &[("films", true), ("series", true)]);
        assert!(validate(&config).is_valid());
    }
}
