//! Validation report formatting.

use std::fmt::Write as _;

use super::{ValidationIssue, ValidationResult, ValidationSeverity};

/// Formats a validation result into a human-readable report.
pub fn format_report(result: &ValidationResult) -> String {
    let errors: Vec<_> = result.errors().collect();
    let warnings: Vec<_> = result.warnings().collect();

    if errors.is_empty() && warnings.is_empty() {
        return "Configuration is valid.\n".to_string();
    }

    let mut report = String::new();

    if !errors.is_empty() {
        report.push_str("\nConfig Validation Failed\n");
        report.push_str("========================\n\n");
        for issue in &errors {
            report.push_str(&format_issue(issue));
        }
    }

    if !warnings.is_empty() {
        if !errors.is_empty() {
            report.push_str("Warnings:\n---------\n\n");
        }
        for issue in &warnings {
            report.push_str(&format_issue(issue));
        }
    }

    let _ = writeln!(report, "---\n{} warning(s), {} error(s)", warnings.len(), errors.len());
    if !errors.is_empty() {
        report.push_str("Config rejected.\n");
    }

    report
}

/// Formats a single validation issue.
fn format_issue(issue: &ValidationIssue) -> String {
    let prefix = match issue.severity {
        ValidationSeverity::Error => "ERROR",
        ValidationSeverity::Warning => "WARNING",
    };

    let mut output = format!("{} {}\n  └─ {}\n", prefix, issue.path, issue.message);
    if let Some(suggestion) = &issue.suggestion {
        let _ = writeln!(output, "     {}", suggestion);
    }
    output.push('\n');

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_report() {
        assert_eq!(format_report(&ValidationResult::new()), "Configuration is valid.\n");
    }

    #[test]
    fn errors_come_before_warnings() {
        let mut result = ValidationResult::new();
        result.add(ValidationIssue::warning("presets[0].burn_keywords[0]", "accents"));
        result.add(
            ValidationIssue::error("watch_folders[0].preset", "Unknown preset: 'Film'")
                .with_suggestion("Did you mean 'Films'?"),
        );

        let report = format_report(&result);
        let error_at = report.find("ERROR watch_folders[0].preset").unwrap();
        let warning_at = report.find("WARNING presets[0].burn_keywords[0]").unwrap();
        assert!(error_at < warning_at);
        assert!(report.contains("     Did you mean 'Films'?"));
        assert!(report.contains("1 warning(s), 1 error(s)"));
        assert!(report.ends_with("Config rejected.\n"));
    }
}
