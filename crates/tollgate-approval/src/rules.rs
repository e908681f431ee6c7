//! Rule configuration: what makes an action sensitive.
//!
//! A [`RuleConfiguration`] holds the sensitive keyword deny-list, the
//! evaluation tier (tool-level, or call-level with per-argument rules), the
//! confirmation deadline and, optionally, the confirmation port to use.
//!
//! Keywords are normalized to lowercase once, when the configuration is
//! built, and the result is immutable. A configuration can therefore be
//! wrapped in an `Arc` and shared by any number of concurrent evaluations.
//!
//! # Example
//!
//! ```
//! use tollgate_approval::RuleConfiguration;
//!
//! let rules = RuleConfiguration::builder()
//!     .sensitive_keywords(["Delete", "DROP"])
//!     .argument_rule("delete_file", "path", ["/etc", "/sys"])
//!     .confirmation_deadline_secs(10)
//!     .build()
//!     .unwrap();
//!
//! assert!(rules.is_call_level());
//! assert!(rules.sensitive_keywords().contains("delete"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::{ActionDescriptor, stringify_argument};
use crate::error::{ApprovalError, ApprovalResult};
use crate::port::ConfirmationPort;

/// Default confirmation deadline in seconds.
pub const DEFAULT_CONFIRMATION_DEADLINE_SECS: u64 = 30;

/// Keyword that matches any value of an argument, as long as it is present.
pub const WILDCARD: &str = "*";

/// Default sensitive keywords: common destructive or irreversible verbs.
pub const DEFAULT_SENSITIVE_KEYWORDS: &[&str] = &[
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
];

/// A set of lowercase keywords matched by substring containment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    /// Normalize keywords to lowercase.
    ///
    /// `field` names the configuration field in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidConfiguration`] if any keyword is
    /// empty or whitespace-only. An empty keyword would match every string.
    pub fn new<I, S>(field: &str, keywords: I) -> ApprovalResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for keyword in keywords {
            let keyword = keyword.as_ref();
            if keyword.trim().is_empty() {
                return Err(ApprovalError::invalid_config(
                    field,
                    "keywords must not be empty",
                ));
            }
            set.insert(keyword.to_lowercase());
        }
        Ok(Self(set))
    }

    /// Whether the set contains `keyword` (compared case-insensitively).
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(&keyword.to_lowercase())
    }

    /// Whether the wildcard keyword is present.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    /// First keyword (in sorted order) contained in `haystack`.
    ///
    /// `haystack` must already be lowercase. The wildcard is matched
    /// literally here; argument rules treat it specially.
    #[must_use]
    pub fn first_match(&self, haystack: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(String::as_str)
    }

    /// Iterate over the normalized keywords.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An argument rule that matched a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMatch {
    /// The argument whose value matched.
    pub argument: String,
    /// The keyword that matched (or `*`).
    pub keyword: String,
}

/// Per-action, per-argument keyword rules for call-level evaluation.
///
/// Action names are matched exactly. An action with no entry is never
/// flagged by argument rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentRules(BTreeMap<String, BTreeMap<String, KeywordSet>>);

impl ArgumentRules {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule: `keywords` found in the stringified value of `argument`
    /// of action `action` mark the call as sensitive.
    ///
    /// Adding a rule for an existing action/argument pair extends its
    /// keyword set.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidConfiguration`] if the action or
    /// argument name is blank, the keyword list is empty, or a keyword is
    /// blank.
    pub fn insert<I, S>(&mut self, action: &str, argument: &str, keywords: I) -> ApprovalResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if action.trim().is_empty() {
            return Err(ApprovalError::invalid_config(
                "argument_rules",
                "action name must not be empty",
            ));
        }
        if argument.trim().is_empty() {
            return Err(ApprovalError::invalid_config(
                format!("argument_rules.{action}"),
                "argument name must not be empty",
            ));
        }

        let field = format!("argument_rules.{action}.{argument}");
        let keywords = KeywordSet::new(&field, keywords)?;
        if keywords.is_empty() {
            return Err(ApprovalError::invalid_config(
                field,
                "at least one keyword (or \"*\") is required",
            ));
        }

        let slot = self
            .0
            .entry(action.to_string())
            .or_default()
            .entry(argument.to_string())
            .or_default();
        slot.0.extend(keywords.0);
        Ok(())
    }

    /// Rules declared for `action`, if any.
    #[must_use]
    pub fn for_action(&self, action: &str) -> Option<&BTreeMap<String, KeywordSet>> {
        self.0.get(action)
    }

    /// Check a descriptor's arguments against the declared rules.
    ///
    /// Only arguments that are present in the descriptor are inspected. A
    /// wildcard keyword matches whenever its argument is present.
    #[must_use]
    pub fn find_match(&self, descriptor: &ActionDescriptor) -> Option<ArgumentMatch> {
        let rules = self.for_action(descriptor.name())?;

        for (argument, keywords) in rules {
            let Some(value) = descriptor.argument(argument) else {
                continue;
            };

            if keywords.has_wildcard() {
                return Some(ArgumentMatch {
                    argument: argument.clone(),
                    keyword: WILDCARD.to_string(),
                });
            }

            let haystack = stringify_argument(value).to_lowercase();
            if let Some(keyword) = keywords.first_match(&haystack) {
                return Some(ArgumentMatch {
                    argument: argument.clone(),
                    keyword: keyword.to_string(),
                });
            }
        }

        None
    }

    /// Number of actions with rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which classification tier the evaluator applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "tier", content = "argument_rules")]
pub enum EvaluationTier {
    /// Name and description only.
    ToolLevel,
    /// Name and description, then declared argument rules.
    CallLevel(ArgumentRules),
}

impl EvaluationTier {
    /// Short label used in logs and audit records.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ToolLevel => "tool",
            Self::CallLevel(_) => "call",
        }
    }
}

/// What happens when nobody answers a confirmation before the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutBehavior {
    /// Deny the action.
    #[default]
    Deny,
    /// Approve the action. Unsafe; only set through an explicit opt-in.
    AutoApprove,
}

impl fmt::Display for TimeoutBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => write!(f, "deny"),
            Self::AutoApprove => write!(f, "auto-approve"),
        }
    }
}

/// Validated, immutable rule configuration.
#[derive(Clone)]
pub struct RuleConfiguration {
    deadline: Duration,
    sensitive_keywords: KeywordSet,
    tier: EvaluationTier,
    timeout_behavior: TimeoutBehavior,
    port: Option<Arc<dyn ConfirmationPort>>,
}

impl RuleConfiguration {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> RuleConfigurationBuilder {
        RuleConfigurationBuilder::new()
    }

    /// The confirmation deadline.
    #[must_use]
    pub fn confirmation_deadline(&self) -> Duration {
        self.deadline
    }

    /// The normalized sensitive keywords.
    #[must_use]
    pub fn sensitive_keywords(&self) -> &KeywordSet {
        &self.sensitive_keywords
    }

    /// The evaluation tier.
    #[must_use]
    pub fn tier(&self) -> &EvaluationTier {
        &self.tier
    }

    /// Whether call-level (argument) rules are applied.
    #[must_use]
    pub fn is_call_level(&self) -> bool {
        matches!(self.tier, EvaluationTier::CallLevel(_))
    }

    /// The argument rules, when evaluating at call level.
    #[must_use]
    pub fn argument_rules(&self) -> Option<&ArgumentRules> {
        match &self.tier {
            EvaluationTier::ToolLevel => None,
            EvaluationTier::CallLevel(rules) => Some(rules),
        }
    }

    /// Behaviour on confirmation timeout.
    #[must_use]
    pub fn timeout_behavior(&self) -> TimeoutBehavior {
        self.timeout_behavior
    }

    /// The confirmation port configured here, if any.
    #[must_use]
    pub fn confirmation_port(&self) -> Option<&Arc<dyn ConfirmationPort>> {
        self.port.as_ref()
    }
}

impl Default for RuleConfiguration {
    /// Tool-level rules with the default keywords and a 30 second deadline.
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(DEFAULT_CONFIRMATION_DEADLINE_SECS),
            sensitive_keywords: KeywordSet(
                DEFAULT_SENSITIVE_KEYWORDS
                    .iter()
                    .map(|k| (*k).to_string())
                    .collect(),
            ),
            tier: EvaluationTier::ToolLevel,
            timeout_behavior: TimeoutBehavior::Deny,
            port: None,
        }
    }
}

impl fmt::Debug for RuleConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleConfiguration")
            .field("deadline", &self.deadline)
            .field("sensitive_keywords", &self.sensitive_keywords)
            .field("tier", &self.tier)
            .field("timeout_behavior", &self.timeout_behavior)
            .field("has_port", &self.port.is_some())
            .finish()
    }
}

/// Builder for [`RuleConfiguration`].
///
/// Values are kept raw until [`build`](Self::build), which validates them
/// and normalizes keywords.
pub struct RuleConfigurationBuilder {
    deadline_secs: u64,
    sensitive_keywords: Vec<String>,
    call_level: bool,
    argument_rules: Vec<(String, String, Vec<String>)>,
    timeout_behavior: TimeoutBehavior,
    port: Option<Arc<dyn ConfirmationPort>>,
}

impl RuleConfigurationBuilder {
    /// A builder seeded with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deadline_secs: DEFAULT_CONFIRMATION_DEADLINE_SECS,
            sensitive_keywords: DEFAULT_SENSITIVE_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
            call_level: false,
            argument_rules: Vec::new(),
            timeout_behavior: TimeoutBehavior::Deny,
            port: None,
        }
    }

    /// Set the confirmation deadline in seconds. Must be positive.
    #[must_use]
    pub fn confirmation_deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = secs;
        self
    }

    /// Replace the sensitive keyword list.
    #[must_use]
    pub fn sensitive_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Evaluate at call level even if no argument rule is declared.
    #[must_use]
    pub fn call_level(mut self) -> Self {
        self.call_level = true;
        self
    }

    /// Declare an argument rule. Implies call-level evaluation.
    #[must_use]
    pub fn argument_rule<I, S>(mut self, action: &str, argument: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.call_level = true;
        self.argument_rules.push((
            action.to_string(),
            argument.to_string(),
            keywords.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Approve actions whose confirmation times out.
    ///
    /// This turns the fail-safe default around: an unattended prompt lets a
    /// dangerous action through. Only use it where a human is known to
    /// watch every prompt and silence means consent.
    #[must_use]
    pub fn auto_approve_on_timeout_unsafe(mut self) -> Self {
        self.timeout_behavior = TimeoutBehavior::AutoApprove;
        self
    }

    /// Set the confirmation port used when the evaluator is not given one.
    #[must_use]
    pub fn confirmation_port(mut self, port: Arc<dyn ConfirmationPort>) -> Self {
        self.port = Some(port);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidConfiguration`] if the deadline is
    /// zero, a keyword is blank, or an argument rule is malformed.
    pub fn build(self) -> ApprovalResult<RuleConfiguration> {
        if self.deadline_secs == 0 {
            return Err(ApprovalError::invalid_config(
                "confirmation_deadline_secs",
                "deadline must be a positive number of seconds",
            ));
        }

        let sensitive_keywords = KeywordSet::new("sensitive_keywords", &self.sensitive_keywords)?;

        let tier = if self.call_level {
            let mut rules = ArgumentRules::new();
            for (action, argument, keywords) in &self.argument_rules {
                rules.insert(action, argument, keywords)?;
            }
            EvaluationTier::CallLevel(rules)
        } else {
            EvaluationTier::ToolLevel
        };

        if self.timeout_behavior == TimeoutBehavior::AutoApprove {
            tracing::warn!("rule configuration approves actions on confirmation timeout");
        }

        Ok(RuleConfiguration {
            deadline: Duration::from_secs(self.deadline_secs),
            sensitive_keywords,
            tier,
            timeout_behavior: self.timeout_behavior,
            port: self.port,
        })
    }
}

impl Default for RuleConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
