//! Configuration validation system.

pub mod paths;
pub mod report;
pub mod schema;
pub mod semantic;

use std::path::Path;
use std::process::Command;

use crate::config::model::AppConfig;
use crate::error::CapabilityError;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Blocks configuration loading.
    Error,
    /// Logged but allows loading.
    Warning,
}

/// A validation issue found during configuration checking.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: ValidationSeverity,
    /// Path to the problematic config field (e.g., "watch_folders[0].preset").
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Optional suggestion for fixing the issue.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Creates a new error-level validation issue.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Creates a new warning-level validation issue.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Adds a suggestion to this validation issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result of validating a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates an empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the result.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Extends the result with issues from another result.
    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Returns the number of errors.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns true if an issue is reported at exactly `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

/// External tools detected at startup.
#[derive(Debug, Clone, Default)]
pub struct SystemCapabilities {
    /// HandBrakeCLI version line, when the binary runs.
    pub handbrake_version: Option<String>,
    /// Whether the configured mediainfo binary runs.
    pub mediainfo_available: bool,
}

impl SystemCapabilities {
    /// Detects HandBrakeCLI and mediainfo.
    pub fn detect(handbrake: &Path, mediainfo: Option<&Path>) -> Self {
        let handbrake_version = match detect_version(handbrake, "--version") {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::debug!(error = %e, "HandBrakeCLI not detected");
                None
            }
        };

        let mediainfo_available = mediainfo
            .map(|path| detect_version(path, "--Version").is_ok())
            .unwrap_or(false);

        Self {
            handbrake_version,
            mediainfo_available,
        }
    }

    /// Capabilities assumed present, for commands that never run the tools.
    pub fn assume_available() -> Self {
        Self {
            handbrake_version: Some("unknown".to_string()),
            mediainfo_available: true,
        }
    }

    pub fn handbrake_available(&self) -> bool {
        self.handbrake_version.is_some()
    }
}

/// Runs `<tool> <flag>` and returns the first non-empty output line.
fn detect_version(tool: &Path, flag: &str) -> Result<String, CapabilityError> {
    let command = format!("{} {}", tool.display(), flag);
    let output = Command::new(tool)
        .arg(flag)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CapabilityError::ToolNotFound {
                tool: tool.display().to_string(),
            },
            _ => CapabilityError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            },
        })?;

    if !output.status.success() {
        return Err(CapabilityError::CommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // Some HandBrakeCLI builds print the version on stderr.
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string())
}

/// Validates the configuration against system capabilities.
pub fn validate_config(config: &AppConfig, capabilities: &SystemCapabilities) -> ValidationResult {
    let mut result = ValidationResult::new();

    // Run all validation layers
    result.extend(schema::validate(config));
    result.extend(semantic::validate(config));
    result.extend(paths::validate(config));
    result.extend(validate_tools(config, capabilities));

    result
}

/// Checks that the external tools the config relies on are installed.
fn validate_tools(config: &AppConfig, capabilities: &SystemCapabilities) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !capabilities.handbrake_available() {
        result.add(
            ValidationIssue::error(
                "global.handbrake.path",
                format!(
                    "HandBrakeCLI not found at '{}'",
                    config.global.handbrake.path.display()
                ),
            )
            .with_suggestion("Install HandBrakeCLI or set global.handbrake.path"),
        );
    }

    if config.global.mediainfo_path.is_some() && !capabilities.mediainfo_available {
        result.add(
            ValidationIssue::warning(
                "global.mediainfo_path",
                "mediainfo not found, subtitles will be analyzed without statistics",
            )
            .with_suggestion("Install mediainfo or set global.mediainfo_path to null"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_counts_by_severity() {
        let mut result = ValidationResult::new();
        result.add(ValidationIssue::warning("a", "w"));
        assert!(result.is_valid());

        result.add(ValidationIssue::error("b", "e").with_suggestion("fix it"));
        assert!(!result.is_valid());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warnings().count(), 1);
        assert!(result.has_issue_at("b"));
    }

    #[test]
    fn missing_tool_is_not_detected() {
        let capabilities = SystemCapabilities::detect(
            Path::new("/nonexistent/HandBrakeCLI"),
            Some(Path::new("/nonexistent/mediainfo")),
        );
        assert!(!capabilities.handbrake_available());
        assert!(!capabilities.mediainfo_available);
    }
}
