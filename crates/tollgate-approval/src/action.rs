//! Action descriptors.
//!
//! An [`ActionDescriptor`] is the immutable description of one tool call an
//! agent wants to make: its name, a human-readable description, and the
//! structured arguments. The orchestrator builds one per proposed call and
//! hands it to the evaluator; nothing in this crate retains it afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{ApprovalError, ApprovalResult};

/// Argument mapping of a tool call (argument name to JSON value).
pub type Arguments = Map<String, Value>;

/// Description of one proposed tool call.
///
/// Fields are private; once built the descriptor cannot be mutated, so the
/// same value can be evaluated any number of times with the same result.
///
/// # Example
///
/// ```
/// use tollgate_approval::ActionDescriptor;
/// use serde_json::json;
///
/// let action = ActionDescriptor::new("delete_file")
///     .unwrap()
///     .with_description("Delete a file")
///     .with_argument("path", json!("a.txt"));
///
/// assert_eq!(action.name(), "delete_file");
/// assert_eq!(action.argument("path"), Some(&json!("a.txt")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct ActionDescriptor {
    name: String,
    description: String,
    arguments: Arguments,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<String>,
}

impl ActionDescriptor {
    /// Create a descriptor with the given name, no description and no
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidDescriptor`] if `name` is empty or
    /// whitespace-only.
    pub fn new(name: impl Into<String>) -> ApprovalResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApprovalError::InvalidDescriptor {
                reason: "action name must not be empty".to_string(),
            });
        }
        Ok(Self {
            name,
            description: String::new(),
            arguments: Arguments::new(),
            client: None,
        })
    }

    /// Set the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add (or replace) a single argument.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Replace the whole argument mapping.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Replace the argument mapping from an arbitrary JSON value.
    ///
    /// `null` is accepted as "no arguments".
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidDescriptor`] if `value` is neither an
    /// object nor `null`.
    pub fn try_with_arguments(self, value: Value) -> ApprovalResult<Self> {
        match value {
            Value::Object(map) => Ok(self.with_arguments(map)),
            Value::Null => Ok(self.with_arguments(Arguments::new())),
            other => Err(ApprovalError::InvalidDescriptor {
                reason: format!(
                    "arguments must be a JSON object, got {}",
                    json_type_name(&other)
                ),
            }),
        }
    }

    /// Tag the descriptor with the client it originated from.
    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// The action (tool) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human-readable description (may be empty).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All arguments.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// A single argument, if present.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// The originating client tag, if any.
    #[must_use]
    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    /// Arguments rendered as indented JSON for display.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the arguments cannot be rendered.
    pub fn pretty_arguments(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.arguments)
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.description)
        }
    }
}

/// Stringify an argument value for keyword matching.
///
/// Strings are used verbatim (no surrounding quotes); every other value uses
/// its compact JSON rendering, so nested objects and arrays are searched as
/// a whole.
#[must_use]
pub fn stringify_argument(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Wire shape used to validate descriptors on deserialization.
#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "args")]
    arguments: Option<Value>,
    #[serde(default)]
    client: Option<String>,
}

impl TryFrom<RawDescriptor> for ActionDescriptor {
    type Error = ApprovalError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let mut descriptor = Self::new(raw.name)?
            .with_description(raw.description)
            .try_with_arguments(raw.arguments.unwrap_or(Value::Null))?;
        descriptor.client = raw.client;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            ActionDescriptor::new(""),
            Err(ApprovalError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            ActionDescriptor::new("   \t"),
            Err(ApprovalError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let action = ActionDescriptor::new("list_users").unwrap();
        assert_eq!(action.description(), "");
        assert!(action.arguments().is_empty());
        assert!(action.client().is_none());
    }

    #[test]
    fn test_builder_fields() {
        let action = ActionDescriptor::new("send_email")
            .unwrap()
            .with_description("Send an email")
            .with_argument("to", json!("ops@example.com"))
            .with_argument("cc", json!(["a@example.com"]))
            .with_client("agent-7");

        assert_eq!(action.description(), "Send an email");
        assert_eq!(action.arguments().len(), 2);
        assert_eq!(action.client(), Some("agent-7"));
        assert_eq!(action.to_string(), "send_email (Send an email)");
    }

    #[test]
    fn test_arguments_must_be_object() {
        let base = ActionDescriptor::new("run_query").unwrap();
        assert!(base.clone().try_with_arguments(json!({"q": 1})).is_ok());
        assert!(base.clone().try_with_arguments(Value::Null).is_ok());

        let err = base.try_with_arguments(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_stringify_argument() {
        assert_eq!(stringify_argument(&json!("/etc/passwd")), "/etc/passwd");
        assert_eq!(stringify_argument(&json!(42)), "42");
        assert_eq!(stringify_argument(&json!(true)), "true");
        assert_eq!(stringify_argument(&Value::Null), "null");
        assert_eq!(
            stringify_argument(&json!({"target": "PROD"})),
            r#"{"target":"PROD"}"#
        );
    }

    #[test]
    fn test_deserialize_validates_name() {
        let ok: ActionDescriptor =
            serde_json::from_value(json!({"name": "get_file", "args": {"path": "x"}})).unwrap();
        assert_eq!(ok.argument("path"), Some(&json!("x")));
        assert_eq!(ok.description(), "");

        let bad = serde_json::from_value::<ActionDescriptor>(json!({"name": " "}));
        assert!(bad.is_err());

        let bad_args =
            serde_json::from_value::<ActionDescriptor>(json!({"name": "x", "arguments": 3}));
        assert!(bad_args.is_err());
    }

    #[test]
    fn test_serialize_omits_missing_client() {
        let action = ActionDescriptor::new("list_users").unwrap();
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("client").is_none());
        assert_eq!(json["name"], "list_users");
    }
}
