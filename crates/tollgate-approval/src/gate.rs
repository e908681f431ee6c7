//! Tool-call gate for orchestrators.
//!
//! Wraps a [`PolicyEvaluator`] for the common case of an agent turn that
//! proposes several tool calls at once. Each call gets a [`GateDecision`]:
//! run it, or hand the denial message back to the model in its place.

use serde::{Deserialize, Serialize};

use crate::action::ActionDescriptor;
use crate::evaluator::PolicyEvaluator;

/// A tool call proposed by the model.
///
/// Deserializes from a flat object: `{"id": "...", "name": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    /// Caller-assigned call ID, echoed back in the decision.
    pub id: String,
    /// The call itself.
    #[serde(flatten)]
    pub action: ActionDescriptor,
}

impl ToolCall {
    /// Pair a call ID with its descriptor.
    pub fn new(id: impl Into<String>, action: ActionDescriptor) -> Self {
        Self {
            id: id.into(),
            action,
        }
    }
}

/// Verdict on a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    /// The call ID from the matching [`ToolCall`].
    pub call_id: String,
    /// The action name.
    pub action: String,
    /// Whether the call may run.
    pub permitted: bool,
    /// Denial message to return to the model instead of tool output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Gate that evaluates the tool calls of one agent turn.
#[derive(Debug, Clone)]
pub struct ToolCallGate {
    evaluator: PolicyEvaluator,
}

impl ToolCallGate {
    /// Create a gate around `evaluator`.
    #[must_use]
    pub fn new(evaluator: PolicyEvaluator) -> Self {
        Self { evaluator }
    }

    /// The underlying evaluator.
    #[must_use]
    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    /// Evaluate one call.
    pub async fn check(&self, call: &ToolCall) -> GateDecision {
        let evaluation = self.evaluator.evaluate_detailed(&call.action).await;
        GateDecision {
            call_id: call.id.clone(),
            action: evaluation.action.clone(),
            permitted: evaluation.is_permitted(),
            message: evaluation.denial_message(),
        }
    }

    /// Evaluate calls one after another, in order.
    ///
    /// Prompts for a single terminal must not interleave, so calls are never
    /// evaluated concurrently here.
    pub async fn check_all(&self, calls: &[ToolCall]) -> Vec<GateDecision> {
        let mut decisions = Vec::with_capacity(calls.len());
        for call in calls {
            decisions.push(self.check(call).await);
        }
        decisions
    }
}
