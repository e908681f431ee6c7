//! Descriptor and rule fixtures.

use serde_json::json;
use tollgate_approval::{ActionDescriptor, RuleConfiguration, ToolCall};

/// Read-only action that no default keyword matches.
#[must_use]
pub fn read_file(path: &str) -> ActionDescriptor {
    descriptor("read_file")
        .with_description("Read a file from the workspace")
        .with_argument("path", json!(path))
}

/// Destructive action matched by the default `delete` keyword.
#[must_use]
pub fn delete_file(path: &str) -> ActionDescriptor {
    descriptor("delete_file")
        .with_description("Remove a file from disk")
        .with_argument("path", json!(path))
}

/// Shell action whose description mentions `execute`.
#[must_use]
pub fn shell(command: &str) -> ActionDescriptor {
    descriptor("shell")
        .with_description("Execute a shell command")
        .with_argument("command", json!(command))
}

/// Descriptor with only a name.
///
/// # Panics
///
/// Panics if `name` is blank.
#[must_use]
pub fn descriptor(name: &str) -> ActionDescriptor {
    match ActionDescriptor::new(name) {
        Ok(d) => d,
        Err(e) => panic!("invalid fixture descriptor {name:?}: {e}"),
    }
}

/// Wrap a descriptor in a tool call.
#[must_use]
pub fn tool_call(id: &str, action: ActionDescriptor) -> ToolCall {
    ToolCall::new(id, action)
}

/// Default rules with a short deadline.
///
/// # Panics
///
/// Panics if `deadline_secs` is zero.
#[must_use]
pub fn rules_with_deadline(deadline_secs: u64) -> RuleConfiguration {
    match RuleConfiguration::builder()
        .confirmation_deadline_secs(deadline_secs)
        .build()
    {
        Ok(rules) => rules,
        Err(e) => panic!("invalid fixture rules: {e}"),
    }
}

/// Call-level rules guarding `read_file.path` against system directories.
///
/// # Panics
///
/// Never in practice; the rules are static.
#[must_use]
pub fn call_level_rules() -> RuleConfiguration {
    match RuleConfiguration::builder()
        .argument_rule("read_file", "path", ["/etc", "/sys", "/root"])
        .build()
    {
        Ok(rules) => rules,
        Err(e) => panic!("invalid fixture rules: {e}"),
    }
}
