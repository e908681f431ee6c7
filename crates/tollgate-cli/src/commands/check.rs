//! CLI handler for `tollgate check`: gate a whole turn of tool calls.

use std::path::Path;

use anyhow::{Context, Result};
use tollgate_approval::{GateDecision, PolicyEvaluator, ToolCall, ToolCallGate};
use tollgate_config::Config;

use super::evaluate::{AnswerArg, OutputFormat, RuleOverrides, fixed_answer_port};
use crate::theme::Theme;

/// Read tool calls from a JSON file (`-` for stdin) and decide each one.
///
/// Calls read from stdin leave nothing for the terminal prompt, so pair
/// `-` with `--answer`. Returns whether every call was permitted.
pub(crate) async fn run_check(
    config: &Config,
    calls_path: &Path,
    overrides: &RuleOverrides,
    answer: Option<AnswerArg>,
    format: OutputFormat,
) -> Result<bool> {
    let raw = if calls_path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read tool calls from stdin")?
    } else {
        std::fs::read_to_string(calls_path)
            .with_context(|| format!("failed to read {}", calls_path.display()))?
    };
    let calls = parse_calls(&raw)?;
    tracing::debug!(count = calls.len(), source = %calls_path.display(), "Gating tool calls");

    let mut builder = PolicyEvaluator::builder(overrides.rules(config)?);
    if let Some(answer) = answer {
        builder = builder.confirmation_port(fixed_answer_port(answer));
    }
    let gate = ToolCallGate::new(builder.build());
    let decisions = gate.check_all(&calls).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decisions)?),
        OutputFormat::Pretty => print_decisions(&decisions),
    }

    Ok(decisions.iter().all(|d| d.permitted))
}

/// Parse a JSON array of calls, or a single call object.
fn parse_calls(raw: &str) -> Result<Vec<ToolCall>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("tool calls are not valid JSON")?;
    let calls = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(calls)
}

fn print_decisions(decisions: &[GateDecision]) {
    for decision in decisions {
        let label = format!("{} ({})", decision.action, decision.call_id);
        match &decision.message {
            None => println!("{}", Theme::success(&label)),
            Some(message) => println!("{}  {}", Theme::error(&label), message),
        }
    }
}
