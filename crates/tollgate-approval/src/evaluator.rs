//! Policy evaluator: the gate between an agent and its tools.
//!
//! The [`PolicyEvaluator`] decides, for each proposed action, whether it may
//! run.
//!
//! # Evaluation flow
//!
//! 1. Lowercase the name and description; if either contains a sensitive
//!    keyword the action is escalated (tool level).
//! 2. At call level, and only if step 1 did not escalate, check the
//!    declared argument rules for this action name.
//! 3. If nothing matched, permit without asking anyone.
//! 4. Otherwise ask the confirmation port, bounded by the deadline.
//! 5. Approval permits. Rejection, timeout, port errors, port panics and an
//!    unavailable port all deny.
//! 6. Record the evaluation with the audit sink.
//!
//! The evaluator holds no per-call mutable state. It is cheap to clone and
//! can evaluate any number of actions concurrently.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::action::ActionDescriptor;
use crate::audit::{AuditRecord, AuditSink, TracingAuditSink};
use crate::cli::CliConfirmationPort;
use crate::invoker::{Bounded, run_with_deadline};
use crate::outcome::{ConfirmationOutcome, Evaluation, MatchedField, Sensitivity};
use crate::port::ConfirmationPort;
use crate::rules::{RuleConfiguration, TimeoutBehavior};

/// Classify an action against `rules` without asking anyone.
///
/// Tool-level keywords are checked against the name first, then the
/// description. Argument rules are only consulted at call level, and only
/// when no tool-level keyword matched.
#[must_use]
pub fn classify(rules: &RuleConfiguration, action: &ActionDescriptor) -> Sensitivity {
    let keywords = rules.sensitive_keywords();

    let name = action.name().to_lowercase();
    if let Some(keyword) = keywords.first_match(&name) {
        return Sensitivity::ToolLevel {
            keyword: keyword.to_string(),
            field: MatchedField::Name,
        };
    }

    let description = action.description().to_lowercase();
    if let Some(keyword) = keywords.first_match(&description) {
        return Sensitivity::ToolLevel {
            keyword: keyword.to_string(),
            field: MatchedField::Description,
        };
    }

    if let Some(found) = rules
        .argument_rules()
        .and_then(|argument_rules| argument_rules.find_match(action))
    {
        return Sensitivity::Argument {
            argument: found.argument,
            keyword: found.keyword,
        };
    }

    Sensitivity::Safe
}

/// Ask `port` to confirm `action`, denying if no answer comes within
/// `deadline`.
///
/// Errors and panics inside the port also deny. Timeouts always deny here;
/// use a [`PolicyEvaluator`] to apply a configured timeout behaviour.
pub async fn request_confirmation(
    action: &ActionDescriptor,
    port: &dyn ConfirmationPort,
    deadline: Duration,
) -> bool {
    confirm_bounded(action, port, deadline, TimeoutBehavior::Deny)
        .await
        .is_permitted()
}

/// Evaluates proposed actions against a [`RuleConfiguration`].
///
/// # Example
///
/// ```
/// use tollgate_approval::prelude::*;
/// use std::sync::Arc;
///
/// # tokio_test_block_on(async {
/// let rules = RuleConfiguration::builder()
///     .sensitive_keywords(["delete"])
///     .build()
///     .unwrap();
/// let evaluator = PolicyEvaluator::builder(rules)
///     .confirmation_port(Arc::new(tollgate_approval::from_fn("deny-all", |_| Ok(false))))
///     .build();
///
/// let safe = ActionDescriptor::new("list_users").unwrap();
/// assert!(evaluator.evaluate(&safe).await);
///
/// let risky = ActionDescriptor::new("delete_file").unwrap();
/// assert!(!evaluator.evaluate(&risky).await);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct PolicyEvaluator {
    rules: Arc<RuleConfiguration>,
    port: Arc<dyn ConfirmationPort>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyEvaluator {
    /// Create an evaluator.
    ///
    /// Uses the port from `rules` if it has one, the terminal otherwise, and
    /// audits through tracing.
    #[must_use]
    pub fn new(rules: RuleConfiguration) -> Self {
        Self::builder(rules).build()
    }

    /// Start building an evaluator.
    #[must_use]
    pub fn builder(rules: impl Into<Arc<RuleConfiguration>>) -> PolicyEvaluatorBuilder {
        PolicyEvaluatorBuilder {
            rules: rules.into(),
            port: None,
            audit: None,
        }
    }

    /// The rule configuration.
    #[must_use]
    pub fn rules(&self) -> &RuleConfiguration {
        &self.rules
    }

    /// The confirmation port in use.
    #[must_use]
    pub fn confirmation_port(&self) -> &Arc<dyn ConfirmationPort> {
        &self.port
    }

    /// Classify an action without asking anyone.
    #[must_use]
    pub fn classify(&self, action: &ActionDescriptor) -> Sensitivity {
        classify(&self.rules, action)
    }

    /// Decide whether `action` may run.
    pub async fn evaluate(&self, action: &ActionDescriptor) -> bool {
        self.evaluate_detailed(action).await.is_permitted()
    }

    /// Decide whether `action` may run, keeping the reasoning.
    pub async fn evaluate_detailed(&self, action: &ActionDescriptor) -> Evaluation {
        let started = Instant::now();
        let sensitivity = self.classify(action);

        let outcome = if sensitivity.requires_confirmation() {
            debug!(
                action = %action.name(),
                escalation = %sensitivity,
                port = self.port.name(),
                "Action requires confirmation"
            );
            confirm_bounded(
                action,
                self.port.as_ref(),
                self.rules.confirmation_deadline(),
                self.rules.timeout_behavior(),
            )
            .await
        } else {
            ConfirmationOutcome::NotRequired
        };

        let evaluation = Evaluation {
            action: action.name().to_string(),
            sensitivity,
            outcome,
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = AuditRecord::new(action, self.rules.tier().label(), &evaluation, elapsed_ms);
        let audited = std::panic::catch_unwind(AssertUnwindSafe(|| self.audit.record(&record)));
        if let Err(payload) = audited {
            error!(
                action = %action.name(),
                panic = %panic_message(payload.as_ref()),
                permitted = evaluation.is_permitted(),
                "Audit sink panicked; verdict unchanged"
            );
        }

        evaluation
    }
}

impl std::fmt::Debug for PolicyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("rules", &self.rules)
            .field("port", &self.port.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PolicyEvaluator`].
pub struct PolicyEvaluatorBuilder {
    rules: Arc<RuleConfiguration>,
    port: Option<Arc<dyn ConfirmationPort>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl PolicyEvaluatorBuilder {
    /// Use `port` for confirmations. Takes precedence over a port set on
    /// the rule configuration.
    #[must_use]
    pub fn confirmation_port(mut self, port: Arc<dyn ConfirmationPort>) -> Self {
        self.port = Some(port);
        self
    }

    /// Send audit records to `sink` instead of tracing.
    #[must_use]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Build the evaluator.
    #[must_use]
    pub fn build(self) -> PolicyEvaluator {
        let port = self
            .port
            .or_else(|| self.rules.confirmation_port().cloned())
            .unwrap_or_else(|| Arc::new(CliConfirmationPort::stdio()));
        let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink));

        PolicyEvaluator {
            rules: self.rules,
            port,
            audit,
        }
    }
}

async fn confirm_bounded(
    action: &ActionDescriptor,
    port: &dyn ConfirmationPort,
    deadline: Duration,
    on_timeout: TimeoutBehavior,
) -> ConfirmationOutcome {
    if !port.is_available() {
        warn!(
            action = %action.name(),
            port = port.name(),
            "Confirmation port unavailable, denying"
        );
        return ConfirmationOutcome::PortFailed {
            reason: format!("confirmation port '{}' is unavailable", port.name()),
        };
    }

    let attempt = AssertUnwindSafe(port.confirm(action)).catch_unwind();
    match run_with_deadline(deadline, "confirmation", attempt).await {
        Bounded::Completed(Ok(Ok(true))) => ConfirmationOutcome::Approved,
        Bounded::Completed(Ok(Ok(false))) => ConfirmationOutcome::Rejected,
        Bounded::Completed(Ok(Err(e))) => {
            warn!(
                action = %action.name(),
                port = port.name(),
                error = %e,
                "Confirmation port failed, denying"
            );
            ConfirmationOutcome::PortFailed {
                reason: e.to_string(),
            }
        },
        Bounded::Completed(Err(payload)) => {
            let message = panic_message(payload.as_ref());
            error!(
                action = %action.name(),
                port = port.name(),
                panic = %message,
                "Confirmation port panicked, denying"
            );
            ConfirmationOutcome::PortFailed {
                reason: format!("confirmation port panicked: {message}"),
            }
        },
        Bounded::TimedOut { after } => match on_timeout {
            TimeoutBehavior::Deny => ConfirmationOutcome::timed_out(after),
            TimeoutBehavior::AutoApprove => {
                warn!(
                    action = %action.name(),
                    "No confirmation before deadline; approving as configured"
                );
                ConfirmationOutcome::AutoApprovedOnTimeout
            },
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
