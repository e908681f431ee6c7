//! Audit trail for evaluations.
//!
//! Every call to the evaluator produces one [`AuditRecord`], handed to the
//! configured [`AuditSink`]. The default sink, [`TracingAuditSink`], emits a
//! structured event on the `tollgate::audit` target so that the logging
//! layer decides where records end up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::action::ActionDescriptor;
use crate::outcome::{ConfirmationOutcome, Evaluation, Sensitivity};

/// Tracing target used by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = "tollgate::audit";

/// One audited evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Unique ID of this evaluation.
    pub evaluation_id: Uuid,
    /// When the evaluation finished.
    pub timestamp: DateTime<Utc>,
    /// Action name.
    pub action: String,
    /// Originating client, if tagged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    /// Evaluation tier label (`tool` or `call`).
    pub tier: &'static str,
    /// Why the action was flagged.
    pub escalation: Sensitivity,
    /// How confirmation resolved.
    pub outcome: ConfirmationOutcome,
    /// Final verdict.
    pub permitted: bool,
    /// Wall-clock time spent, in milliseconds.
    pub elapsed_ms: u64,
}

impl AuditRecord {
    /// Build a record for a finished evaluation.
    #[must_use]
    pub fn new(
        descriptor: &ActionDescriptor,
        tier: &'static str,
        evaluation: &Evaluation,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: descriptor.name().to_string(),
            client: descriptor.client().map(str::to_string),
            tier,
            escalation: evaluation.sensitivity.clone(),
            outcome: evaluation.outcome.clone(),
            permitted: evaluation.is_permitted(),
            elapsed_ms,
        }
    }
}

/// Receives audit records.
///
/// `record` is called inline on the evaluating task and must not block.
/// A panic in `record` is logged by the evaluator and does not change the
/// verdict it returns.
pub trait AuditSink: Send + Sync {
    /// Record one evaluation.
    fn record(&self, record: &AuditRecord);
}

/// Audit sink that emits tracing events.
///
/// Permitted actions are logged at `info` (safe ones at `debug`), denied
/// ones at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        let client = record.client.as_deref().unwrap_or("-");
        let escalation = record.escalation.to_string();
        let outcome = record.outcome.label();

        if !record.permitted {
            tracing::warn!(
                target: AUDIT_TARGET,
                evaluation_id = %record.evaluation_id,
                action = %record.action,
                client,
                tier = record.tier,
                escalation = %escalation,
                outcome,
                elapsed_ms = record.elapsed_ms,
                "Action denied"
            );
        } else if record.escalation.requires_confirmation() {
            tracing::info!(
                target: AUDIT_TARGET,
                evaluation_id = %record.evaluation_id,
                action = %record.action,
                client,
                tier = record.tier,
                escalation = %escalation,
                outcome,
                elapsed_ms = record.elapsed_ms,
                "Sensitive action permitted"
            );
        } else {
            tracing::debug!(
                target: AUDIT_TARGET,
                evaluation_id = %record.evaluation_id,
                action = %record.action,
                client,
                tier = record.tier,
                "Action permitted without confirmation"
            );
        }
    }
}

/// Audit sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: &AuditRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::MatchedField;

    #[test]
    fn test_record_from_evaluation() {
        let descriptor = ActionDescriptor::new("drop_table")
            .unwrap()
            .with_client("agent-1");
        let evaluation = Evaluation {
            action: "drop_table".to_string(),
            sensitivity: Sensitivity::ToolLevel {
                keyword: "drop".to_string(),
                field: MatchedField::Name,
            },
            outcome: ConfirmationOutcome::Rejected,
        };

        let record = AuditRecord::new(&descriptor, "tool", &evaluation, 12);
        assert_eq!(record.action, "drop_table");
        assert_eq!(record.client.as_deref(), Some("agent-1"));
        assert!(!record.permitted);
        assert_eq!(record.elapsed_ms, 12);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tier"], "tool");
        assert_eq!(json["outcome"]["outcome"], "rejected");
        assert!(json["evaluation_id"].is_string());
    }

    #[test]
    fn test_sinks_accept_records() {
        let descriptor = ActionDescriptor::new("list").unwrap();
        let evaluation = Evaluation {
            action: "list".to_string(),
            sensitivity: Sensitivity::Safe,
            outcome: ConfirmationOutcome::NotRequired,
        };
        let record = AuditRecord::new(&descriptor, "tool", &evaluation, 0);
        assert!(record.client.is_none());

        TracingAuditSink.record(&record);
        NullAuditSink.record(&record);
    }
}
