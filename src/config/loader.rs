//! Configuration file loading and parsing.

use std::path::Path;

use anyhow::{Context, Result};

use super::model::AppConfig;
use crate::error::ConfigError;
use crate::validation::report::format_report;
use crate::validation::{validate_config, SystemCapabilities};

/// Loads the configuration file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse(&content, path)
}

/// Parses YAML configuration text; `origin` is only used in error messages.
pub fn parse(content: &str, origin: &Path) -> Result<AppConfig, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseFailed {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads and fully validates the configuration file.
pub fn load_and_validate(path: &Path, capabilities: &SystemCapabilities) -> Result<AppConfig> {
    let config = load_from_path(path).context("Failed to load configuration")?;

    let result = validate_config(&config, capabilities);

    for issue in result.warnings() {
        tracing::warn!(
            path = %issue.path,
            message = %issue.message,
            suggestion = ?issue.suggestion,
            "Config validation warning"
        );
    }

    if !result.is_valid() {
        tracing::error!("{}", format_report(&result));
        anyhow::bail!(ConfigError::ValidationFailed {
            error_count: result.error_count()
        });
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_from_path(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn bad_yaml_is_a_parse_error() {
        let err = parse("global: [", Path::new("inline")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            format!(
                "global:\n  output_dir: {}\n  state_dir: {}\n\
                 watch_folders:\n  - path: {}\n    preset: Nope\n",
                dir.path().join("out").display(),
                dir.path().join("state").display(),
                dir.path().display()
            ),
        )
        .unwrap();

        let err = load_and_validate(&path, &SystemCapabilities::assume_available()).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }
}
