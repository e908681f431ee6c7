//! Common imports for tests.
//!
//! ```rust,ignore
//! use tollgate_test::prelude::*;
//! ```

pub use crate::fixtures::{
    call_level_rules, delete_file, descriptor, read_file, rules_with_deadline, shell, tool_call,
};
pub use crate::harness::{setup_test_logging, setup_test_logging_default};
pub use crate::mocks::{RecordingAuditSink, Reply, ScriptedPort, StaticPort};
