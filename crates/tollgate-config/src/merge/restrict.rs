use tracing::warn;

use super::path::{get_nested, set_nested};

const KEYWORDS: &[&str] = &["approval", "sensitive_keywords"];
const ARGUMENT_RULES: &[&str] = &["approval", "argument_rules"];
const DEADLINE: &[&str] = &["approval", "confirmation_deadline_secs"];
const MODE: &[&str] = &["approval", "mode"];
const ON_TIMEOUT: &[&str] = &["approval", "on_timeout"];

/// Make sure the workspace layer only tightened the approval rules.
///
/// Call after merging the workspace layer. `baseline` is the merged tree
/// before the workspace layer was applied and `workspace_layer` is the raw
/// workspace file.
///
/// A workspace may add keywords and argument rules, shorten the deadline and
/// switch to call mode. It may not remove keywords or rules, lengthen the
/// deadline, drop back to tool mode, or turn on approve-on-timeout; such
/// changes are reverted with a warning.
pub fn enforce_restrictions(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace_layer: &toml::Value,
) {
    union_string_arrays(merged, baseline, workspace_layer, KEYWORDS);
    keep_argument_rules(merged, baseline, workspace_layer);
    clamp_max_int(merged, baseline, workspace_layer, DEADLINE);
    enforce_mode_tighten(merged, baseline, workspace_layer, MODE, &["call", "tool"]);
    enforce_mode_tighten(
        merged,
        baseline,
        workspace_layer,
        ON_TIMEOUT,
        &["deny", "approve"],
    );
}

fn field_name(path: &[&str]) -> String {
    path.join(".")
}

/// Workspace can only add entries to a string array.
fn union_string_arrays(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
) {
    let Some(baseline_items) = get_nested(baseline, path).and_then(toml::Value::as_array) else {
        return;
    };
    if get_nested(workspace, path).is_none() {
        return;
    }

    let mut result = get_nested(merged, path)
        .and_then(toml::Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut restored = 0usize;
    for item in baseline_items {
        if !result.contains(item) {
            result.push(item.clone());
            restored = restored.saturating_add(1);
        }
    }

    if restored > 0 {
        warn!(
            field = %field_name(path),
            restored,
            "Workspace config removed entries; restoring them (workspace can only add)"
        );
    }
    set_nested(merged, path, toml::Value::Array(result));
}

/// Workspace can add argument rules and keywords, never remove them.
fn keep_argument_rules(merged: &mut toml::Value, baseline: &toml::Value, workspace: &toml::Value) {
    let Some(base_actions) = get_nested(baseline, ARGUMENT_RULES).and_then(toml::Value::as_table)
    else {
        return;
    };
    if get_nested(workspace, ARGUMENT_RULES).is_none() {
        return;
    }

    for (action, base_args) in base_actions {
        let Some(base_args) = base_args.as_table() else {
            continue;
        };
        for argument in base_args.keys() {
            let path = [ARGUMENT_RULES[0], ARGUMENT_RULES[1], action.as_str(), argument.as_str()];
            union_string_arrays(merged, baseline, workspace, &path);
        }
    }
}

/// Workspace can only lower an integer field.
fn clamp_max_int(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
) {
    let baseline_val = get_nested(baseline, path).and_then(toml::Value::as_integer);
    let ws_val = get_nested(workspace, path).and_then(toml::Value::as_integer);

    if let (Some(base_v), Some(ws_v)) = (baseline_val, ws_val)
        && ws_v > base_v
    {
        warn!(
            field = %field_name(path),
            "Workspace config tried to increase from {base_v} to {ws_v}; clamping to {base_v}"
        );
        set_nested(merged, path, toml::Value::Integer(base_v));
    }
}

/// Workspace can only move an ordered string field towards the strict end.
/// `ordered` runs from strictest to most permissive.
fn enforce_mode_tighten(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
    ordered: &[&str],
) {
    let baseline_str = get_nested(baseline, path).and_then(toml::Value::as_str);
    let ws_str = get_nested(workspace, path).and_then(toml::Value::as_str);

    if let (Some(base_s), Some(ws_s)) = (baseline_str, ws_str) {
        let base_idx = ordered.iter().position(|m| *m == base_s);
        let ws_idx = ordered.iter().position(|m| *m == ws_s);

        if let (Some(b_idx), Some(w_idx)) = (base_idx, ws_idx)
            && w_idx > b_idx
        {
            warn!(
                field = %field_name(path),
                "Workspace config tried to loosen \"{base_s}\" to \"{ws_s}\"; reverting"
            );
            set_nested(merged, path, toml::Value::String(base_s.to_owned()));
        }
    }
}
