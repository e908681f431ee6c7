//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApprovalError, ApprovalResult, ConfirmationError};

// Descriptors
pub use crate::{ActionDescriptor, Arguments};

// Rules
pub use crate::{EvaluationTier, RuleConfiguration, RuleConfigurationBuilder, TimeoutBehavior};

// Confirmation
pub use crate::{CliConfirmationPort, ConfirmationPort};

// Evaluation
pub use crate::{ConfirmationOutcome, Evaluation, PolicyEvaluator, Sensitivity};

// Gate
pub use crate::{GateDecision, ToolCall, ToolCallGate};

// Audit
pub use crate::{AuditRecord, AuditSink, TracingAuditSink};
