//! Bridge from `tollgate_config::Config` to domain types.

use std::path::PathBuf;

use tollgate_approval::{ApprovalResult, RuleConfiguration};
use tollgate_config::{Config, EvaluationMode, OnTimeout};
use tollgate_telemetry::{LogConfig, LogFormat};

/// Build the approval rules described by `[approval]`.
///
/// Argument rules are only carried over in `call` mode.
///
/// # Errors
///
/// Returns an error if the section describes invalid rules (zero deadline,
/// blank keywords).
pub fn to_rule_configuration(cfg: &Config) -> ApprovalResult<RuleConfiguration> {
    let approval = &cfg.approval;

    let mut builder = RuleConfiguration::builder()
        .confirmation_deadline_secs(approval.confirmation_deadline_secs)
        .sensitive_keywords(approval.sensitive_keywords.iter().map(String::as_str));

    if approval.mode == EvaluationMode::Call {
        builder = builder.call_level();
        for (action, arguments) in &approval.argument_rules {
            for (argument, keywords) in arguments {
                builder =
                    builder.argument_rule(action, argument, keywords.iter().map(String::as_str));
            }
        }
    }

    if approval.on_timeout == OnTimeout::Approve {
        builder = builder.auto_approve_on_timeout_unsafe();
    }

    builder.build()
}

/// Convert `[logging]` to a [`LogConfig`].
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.to_lowercase().as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(cfg.logging.level.to_lowercase()).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    if let Some(directory) = &cfg.logging.directory {
        log_config = log_config.with_file_logging(PathBuf::from(directory), "tollgate");
    }

    if let Some(directory) = &cfg.logging.audit_directory {
        log_config = log_config.with_audit_log(PathBuf::from(directory));
    }

    log_config
}
