//! Post-merge configuration validation.

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, EvaluationMode, OnTimeout};

/// Longest accepted confirmation deadline (one day).
pub const MAX_DEADLINE_SECS: u64 = 86_400;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_approval(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_approval(config: &Config) -> ConfigResult<()> {
    let a = &config.approval;

    if a.confirmation_deadline_secs == 0 || a.confirmation_deadline_secs > MAX_DEADLINE_SECS {
        return Err(ConfigError::invalid(
            "approval.confirmation_deadline_secs",
            format!(
                "deadline must be between 1 and {MAX_DEADLINE_SECS} seconds, got {}",
                a.confirmation_deadline_secs
            ),
        ));
    }

    if a.sensitive_keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "approval.sensitive_keywords",
            "keywords must not be empty",
        ));
    }

    for (action, arguments) in &a.argument_rules {
        if action.trim().is_empty() {
            return Err(ConfigError::invalid(
                "approval.argument_rules",
                "action name must not be empty",
            ));
        }
        for (argument, keywords) in arguments {
            let field = format!("approval.argument_rules.{action}.{argument}");
            if argument.trim().is_empty() {
                return Err(ConfigError::invalid(field, "argument name must not be empty"));
            }
            if keywords.is_empty() {
                return Err(ConfigError::invalid(
                    field,
                    "at least one keyword (or \"*\") is required",
                ));
            }
            if keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::invalid(field, "keywords must not be empty"));
            }
        }
    }

    if a.mode == EvaluationMode::Tool && !a.argument_rules.is_empty() {
        warn!(
            rules = a.argument_rules.len(),
            "approval.argument_rules are ignored in tool mode; set approval.mode = \"call\""
        );
    }

    if a.on_timeout == OnTimeout::Approve {
        warn!("approval.on_timeout = \"approve\": unanswered confirmations will be approved");
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_lowercase().as_str()) {
        return Err(ConfigError::invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&l.format.to_lowercase().as_str()) {
        return Err(ConfigError::invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_deadline_bounds() {
        let mut config = Config::default();
        config.approval.confirmation_deadline_secs = 0;
        assert_eq!(
            field_of(validate(&config)),
            "approval.confirmation_deadline_secs"
        );

        config.approval.confirmation_deadline_secs = MAX_DEADLINE_SECS.saturating_add(1);
        assert!(validate(&config).is_err());

        config.approval.confirmation_deadline_secs = 1;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_blank_keyword_rejected() {
        let mut config = Config::default();
        config.approval.sensitive_keywords.push("  ".to_owned());
        assert_eq!(field_of(validate(&config)), "approval.sensitive_keywords");
    }

    #[test]
    fn test_argument_rule_needs_keywords() {
        let mut config = Config::default();
        config
            .approval
            .argument_rules
            .entry("delete_file".to_owned())
            .or_default()
            .insert("path".to_owned(), Vec::new());
        assert_eq!(
            field_of(validate(&config)),
            "approval.argument_rules.delete_file.path"
        );
    }

    #[test]
    fn test_argument_rules_in_tool_mode_only_warn() {
        let mut config = Config::default();
        config
            .approval
            .argument_rules
            .entry("delete_file".to_owned())
            .or_default()
            .insert("path".to_owned(), vec!["/etc".to_owned()]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_logging_values() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");

        let mut config = Config::default();
        config.logging.level = "DEBUG".to_owned();
        assert!(validate(&config).is_ok());
    }
}
