//! Configuration types.
//!
//! These types have no dependency on the approval crate. They mirror its
//! rule configuration in plain, serializable form; the CLI converts between
//! the two. Every struct implements [`Default`] with the same values as
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Approval rules.
    pub approval: ApprovalSection,
    /// Logging level, format and destinations.
    pub logging: LoggingSection,
}

/// Which classification tier to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Name and description keywords only.
    #[default]
    Tool,
    /// Keywords plus per-argument rules.
    Call,
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Call => write!(f, "call"),
        }
    }
}

/// What an unanswered confirmation means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTimeout {
    /// Deny the action.
    #[default]
    Deny,
    /// Approve the action.
    Approve,
}

/// Argument rules: action name to argument name to keywords.
pub type ArgumentRulesSection = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// `[approval]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Seconds to wait for a confirmation.
    pub confirmation_deadline_secs: u64,
    /// Classification tier.
    pub mode: EvaluationMode,
    /// Timeout behaviour.
    pub on_timeout: OnTimeout,
    /// Keywords that make an action sensitive.
    pub sensitive_keywords: Vec<String>,
    /// Per-argument rules, applied in `call` mode.
    pub argument_rules: ArgumentRulesSection,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            confirmation_deadline_secs: 30,
            mode: EvaluationMode::Tool,
            on_timeout: OnTimeout::Deny,
            sensitive_keywords: [
                "delete",
                "remove",
                "drop",
                "truncate",
                "destroy",
                "kill",
                "terminate",
                "shutdown",
                "reboot",
                "restart",
                "modify",
                "update",
                "execute",
                "run",
                "eval",
            ]
            .iter()
            .map(|k| (*k).to_owned())
            .collect(),
            argument_rules: ArgumentRulesSection::new(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra filter directives (e.g. `tollgate_approval=debug`).
    pub directives: Vec<String>,
    /// Write logs to rolling files in this directory instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Also write audit records as JSON to this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_directory: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
            audit_directory: None,
        }
    }
}
