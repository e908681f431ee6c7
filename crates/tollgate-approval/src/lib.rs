//! Tollgate Approval - policy gate for agent tool calls.
//!
//! This crate decides whether a tool call proposed by an agent may run. Calls
//! that match no configured rule run straight away; sensitive ones need an
//! explicit yes from a confirmation port (a terminal prompt, a chat bot, a
//! web UI) within a deadline.
//!
//! # Components
//!
//! - [`ActionDescriptor`]: immutable description of one proposed call
//! - [`RuleConfiguration`]: sensitive keywords, argument rules, deadline
//! - [`ConfirmationPort`]: pluggable yes/no capability, with the reference
//!   [`CliConfirmationPort`]
//! - [`run_with_deadline`]: bounded invocation of any future
//! - [`PolicyEvaluator`]: classification plus bounded confirmation
//! - [`ToolCallGate`]: per-turn wrapper producing [`GateDecision`]s
//! - [`AuditSink`]: where evaluation records go
//!
//! # Fail-closed
//!
//! Once an action is deemed sensitive, every path other than an explicit
//! approval denies it: rejection, timeout, port errors, port panics and an
//! unavailable port. Approving on timeout is possible only through an
//! explicitly named opt-in.
//!
//! # Example
//!
//! ```
//! use tollgate_approval::prelude::*;
//! use serde_json::json;
//!
//! let rules = RuleConfiguration::builder()
//!     .sensitive_keywords(["delete"])
//!     .argument_rule("read_file", "path", ["/etc"])
//!     .build()
//!     .unwrap();
//!
//! let evaluator = PolicyEvaluator::new(rules);
//!
//! let safe = ActionDescriptor::new("read_file")
//!     .unwrap()
//!     .with_argument("path", json!("/tmp/note.txt"));
//! assert_eq!(evaluator.classify(&safe), Sensitivity::Safe);
//!
//! let secret = ActionDescriptor::new("read_file")
//!     .unwrap()
//!     .with_argument("path", json!("/etc/shadow"));
//! assert!(evaluator.classify(&secret).requires_confirmation());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod action;
pub mod audit;
pub mod cli;
/// Error types and results for the approval crate.
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod invoker;
pub mod outcome;
pub mod port;
pub mod rules;

pub use action::{ActionDescriptor, Arguments, stringify_argument};
pub use audit::{AUDIT_TARGET, AuditRecord, AuditSink, NullAuditSink, TracingAuditSink};
pub use cli::CliConfirmationPort;
pub use error::{ApprovalError, ApprovalResult, ConfirmationError};
pub use evaluator::{PolicyEvaluator, PolicyEvaluatorBuilder, classify, request_confirmation};
pub use gate::{GateDecision, ToolCall, ToolCallGate};
pub use invoker::{Bounded, run_with_deadline};
pub use outcome::{ConfirmationOutcome, Evaluation, MatchedField, Sensitivity};
pub use port::{ConfirmationPort, FnPort, from_fn};
pub use rules::{
    ArgumentMatch, ArgumentRules, DEFAULT_CONFIRMATION_DEADLINE_SECS, DEFAULT_SENSITIVE_KEYWORDS,
    EvaluationTier, KeywordSet, RuleConfiguration, RuleConfigurationBuilder, TimeoutBehavior,
    WILDCARD,
};
