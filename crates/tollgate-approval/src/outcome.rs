//! Evaluation results.
//!
//! [`Sensitivity`] says why (or whether) an action was flagged.
//! [`ConfirmationOutcome`] says how the confirmation step resolved. An
//! [`Evaluation`] pairs the two and reduces them to the final verdict.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Which descriptor field a tool-level keyword was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedField {
    /// The action name.
    Name,
    /// The action description.
    Description,
}

impl fmt::Display for MatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Description => write!(f, "description"),
        }
    }
}

/// Classification of an action against the rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Sensitivity {
    /// No rule matched; the action needs no confirmation.
    Safe,
    /// A sensitive keyword appeared in the name or description.
    ToolLevel {
        /// The matching keyword.
        keyword: String,
        /// Where it was found.
        field: MatchedField,
    },
    /// An argument rule matched.
    Argument {
        /// The argument whose value matched.
        argument: String,
        /// The matching keyword, or `*`.
        keyword: String,
    },
}

impl Sensitivity {
    /// Whether the action must be confirmed.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, Self::Safe)
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::ToolLevel { keyword, field } => {
                write!(f, "keyword '{keyword}' in {field}")
            },
            Self::Argument { argument, keyword } => {
                write!(f, "argument '{argument}' matched '{keyword}'")
            },
        }
    }
}

/// How the confirmation step resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ConfirmationOutcome {
    /// The action was safe; no one was asked.
    NotRequired,
    /// The port approved.
    Approved,
    /// The port rejected.
    Rejected,
    /// The deadline elapsed and the action was denied.
    TimedOut {
        /// The deadline that elapsed, in seconds.
        deadline_secs: u64,
    },
    /// The deadline elapsed and the action was approved anyway.
    AutoApprovedOnTimeout,
    /// The port errored, panicked or was unavailable.
    PortFailed {
        /// What went wrong.
        reason: String,
    },
}

impl ConfirmationOutcome {
    /// Build a timeout outcome for `deadline`.
    #[must_use]
    pub fn timed_out(deadline: Duration) -> Self {
        Self::TimedOut {
            deadline_secs: deadline.as_secs(),
        }
    }

    /// Whether this outcome lets the action run.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        matches!(
            self,
            Self::NotRequired | Self::Approved | Self::AutoApprovedOnTimeout
        )
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotRequired => "not_required",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::TimedOut { .. } => "timed_out",
            Self::AutoApprovedOnTimeout => "auto_approved_on_timeout",
            Self::PortFailed { .. } => "port_failed",
        }
    }
}

/// Full result of evaluating one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// The evaluated action's name.
    pub action: String,
    /// Why the action was (or was not) flagged.
    pub sensitivity: Sensitivity,
    /// How confirmation resolved.
    pub outcome: ConfirmationOutcome,
}

impl Evaluation {
    /// Whether the action may run.
    #[must_use]
    pub fn is_permitted(&self) -> bool {
        self.outcome.is_permitted()
    }

    /// Message to hand back to the agent in place of a denied tool's output.
    ///
    /// `None` if the action is permitted.
    #[must_use]
    pub fn denial_message(&self) -> Option<String> {
        let name = &self.action;
        match &self.outcome {
            ConfirmationOutcome::Rejected => {
                Some(format!("Tool execution denied by approval system: {name}"))
            },
            ConfirmationOutcome::TimedOut { deadline_secs } => Some(format!(
                "Tool execution denied by approval system: {name} (no confirmation within {deadline_secs}s)"
            )),
            ConfirmationOutcome::PortFailed { reason } => {
                Some(format!("Approval check failed for {name}: {reason}"))
            },
            ConfirmationOutcome::NotRequired
            | ConfirmationOutcome::Approved
            | ConfirmationOutcome::AutoApprovedOnTimeout => None,
        }
    }
}
