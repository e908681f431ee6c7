//! Environment variable fallbacks.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Environment variable name and the config field it fills.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TOLLGATE_APPROVAL_DEADLINE_SECS",
        field_path: "approval.confirmation_deadline_secs",
    },
    EnvMapping {
        var_name: "TOLLGATE_APPROVAL_MODE",
        field_path: "approval.mode",
    },
    EnvMapping {
        var_name: "TOLLGATE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "TOLLGATE_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Names of all environment variables consulted as fallbacks.
pub fn fallback_vars() -> impl Iterator<Item = &'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name)
}

/// Apply environment variable fallbacks to fields not set by any file.
///
/// Defaults do not count as "set": an env var overrides a built-in default
/// but never a value from a config file. Returns the number applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted field from a string, creating intermediate tables.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let value = coerce_to_toml_value(path, val);
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Integer fields are parsed as integers; everything else stays a string.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if path == "approval.confirmation_deadline_secs"
        && let Ok(i) = val.trim().parse::<i64>()
    {
        return toml::Value::Integer(i);
    }
    toml::Value::String(val.trim().to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn base() -> toml::Value {
        toml::from_str(
            r#"
            [approval]
            confirmation_deadline_secs = 30
            mode = "tool"
        "#,
        )
        .unwrap()
    }

    #[test]
    fn test_env_fills_defaulted_fields() {
        let mut merged = base();
        let mut sources = FieldSources::new();
        sources.insert(
            "approval.confirmation_deadline_secs".to_owned(),
            ConfigLayer::Defaults,
        );

        let env = make_env(&[
            ("TOLLGATE_APPROVAL_DEADLINE_SECS", "12"),
            ("TOLLGATE_LOG_LEVEL", "debug"),
        ]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 2);
        assert_eq!(
            merged["approval"]["confirmation_deadline_secs"].as_integer(),
            Some(12)
        );
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_does_not_override_files() {
        let mut merged = base();
        let mut sources = FieldSources::new();
        sources.insert("approval.mode".to_owned(), ConfigLayer::User);

        let env = make_env(&[("TOLLGATE_APPROVAL_MODE", "call")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["approval"]["mode"].as_str(), Some("tool"));
    }

    #[test]
    fn test_non_numeric_deadline_stays_string() {
        let mut merged = base();
        let mut sources = FieldSources::new();
        let env = make_env(&[("TOLLGATE_APPROVAL_DEADLINE_SECS", "soon")]);
        apply_env_fallbacks(&mut merged, &mut sources, &env);
        assert_eq!(
            merged["approval"]["confirmation_deadline_secs"].as_str(),
            Some("soon")
        );
    }

    #[test]
    fn test_fallback_vars_listed() {
        let vars: Vec<&str> = fallback_vars().collect();
        assert!(vars.contains(&"TOLLGATE_APPROVAL_MODE"));
        assert_eq!(vars.len(), 4);
    }
}
