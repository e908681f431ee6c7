//! CLI handlers for `tollgate evaluate` and `tollgate classify`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tollgate_approval::{
    ActionDescriptor, ConfirmationPort, Evaluation, PolicyEvaluator, RuleConfiguration,
    Sensitivity, from_fn,
};
use tollgate_config::{Config, EvaluationMode};

use crate::config_bridge;
use crate::theme::Theme;

/// The action to evaluate, as given on the command line.
#[derive(Debug, Args)]
pub(crate) struct ActionArgs {
    /// Tool name
    #[arg(short, long)]
    pub(crate) name: String,

    /// Tool description
    #[arg(short, long, default_value = "")]
    pub(crate) description: String,

    /// Arguments as a JSON object
    #[arg(short, long)]
    pub(crate) args: Option<String>,

    /// Originating client, recorded in the audit trail
    #[arg(long)]
    pub(crate) client: Option<String>,
}

impl ActionArgs {
    /// Build the descriptor, parsing `--args` as JSON.
    pub(crate) fn to_descriptor(&self) -> Result<ActionDescriptor> {
        let mut descriptor =
            ActionDescriptor::new(&self.name)?.with_description(self.description.as_str());

        if let Some(raw) = &self.args {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--args is not valid JSON")?;
            descriptor = descriptor.try_with_arguments(value)?;
        }

        if let Some(client) = &self.client {
            descriptor = descriptor.with_client(client.as_str());
        }

        Ok(descriptor)
    }
}

/// Evaluation tier chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ModeArg {
    /// Name and description keywords only
    Tool,
    /// Keywords plus argument rules
    Call,
}

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Args)]
pub(crate) struct RuleOverrides {
    /// Evaluation tier (overrides approval.mode)
    #[arg(long, value_enum)]
    pub(crate) mode: Option<ModeArg>,

    /// Confirmation deadline in seconds (overrides approval.confirmation_deadline_secs)
    #[arg(long)]
    pub(crate) deadline: Option<u64>,
}

impl RuleOverrides {
    /// Apply the overrides and build the rules.
    pub(crate) fn rules(&self, config: &Config) -> Result<RuleConfiguration> {
        let mut config = config.clone();
        if let Some(mode) = self.mode {
            config.approval.mode = match mode {
                ModeArg::Tool => EvaluationMode::Tool,
                ModeArg::Call => EvaluationMode::Call,
            };
        }
        if let Some(deadline) = self.deadline {
            config.approval.confirmation_deadline_secs = deadline;
        }
        tollgate_config::validate::validate(&config)?;
        Ok(config_bridge::to_rule_configuration(&config)?)
    }
}

/// Fixed answer instead of prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum AnswerArg {
    /// Approve every confirmation
    Approve,
    /// Reject every confirmation
    Reject,
}

/// Output format for verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON document on stdout
    Json,
}

/// Evaluate an action, prompting on the terminal if it is sensitive.
///
/// Returns whether the action is permitted.
pub(crate) async fn run_evaluate(
    config: &Config,
    action: &ActionArgs,
    overrides: &RuleOverrides,
    answer: Option<AnswerArg>,
    format: OutputFormat,
) -> Result<bool> {
    let rules = overrides.rules(config)?;
    let descriptor = action.to_descriptor()?;

    let mut builder = PolicyEvaluator::builder(rules);
    if let Some(answer) = answer {
        builder = builder.confirmation_port(fixed_answer_port(answer));
    }
    let evaluation = builder.build().evaluate_detailed(&descriptor).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        OutputFormat::Pretty => print_evaluation(&evaluation),
    }

    Ok(evaluation.is_permitted())
}

/// Classify an action without asking anyone.
pub(crate) fn run_classify(
    config: &Config,
    action: &ActionArgs,
    overrides: &RuleOverrides,
    format: OutputFormat,
) -> Result<()> {
    let rules = overrides.rules(config)?;
    let descriptor = action.to_descriptor()?;
    let sensitivity = tollgate_approval::classify(&rules, &descriptor);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sensitivity)?),
        OutputFormat::Pretty => {
            println!("{}", Theme::header(descriptor.name()));
            println!("{}", Theme::field("tier", rules.tier().label()));
            print_sensitivity(&sensitivity);
        },
    }

    Ok(())
}

/// Port that gives `answer` to every request.
pub(crate) fn fixed_answer_port(answer: AnswerArg) -> Arc<dyn ConfirmationPort> {
    match answer {
        AnswerArg::Approve => Arc::new(from_fn("fixed-approve", |_| Ok(true))),
        AnswerArg::Reject => Arc::new(from_fn("fixed-reject", |_| Ok(false))),
    }
}

fn print_sensitivity(sensitivity: &Sensitivity) {
    if sensitivity.requires_confirmation() {
        println!("{}", Theme::warning(&format!("sensitive: {sensitivity}")));
    } else {
        println!("{}", Theme::success("safe"));
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("{}", Theme::header(&evaluation.action));
    print_sensitivity(&evaluation.sensitivity);
    println!("{}", Theme::field("outcome", evaluation.outcome.label()));

    match evaluation.denial_message() {
        Some(message) => println!("{}", Theme::error(&message)),
        None => println!("{}", Theme::success("permitted")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: Option<&str>) -> ActionArgs {
        ActionArgs {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            args: args.map(str::to_string),
            client: Some("ci".to_string()),
        }
    }

    #[test]
    fn test_descriptor_from_args() {
        let descriptor = action(Some(r#"{"path": "/etc/passwd"}"#))
            .to_descriptor()
            .unwrap();
        assert_eq!(descriptor.name(), "read_file");
        assert_eq!(descriptor.client(), Some("ci"));
        assert_eq!(
            descriptor.argument("path"),
            Some(&serde_json::json!("/etc/passwd"))
        );
    }

    #[test]
    fn test_descriptor_rejects_bad_json() {
        assert!(action(Some("{not json")).to_descriptor().is_err());
        assert!(action(Some("[1, 2]")).to_descriptor().is_err());
    }

    #[test]
    fn test_overrides() {
        let overrides = RuleOverrides {
            mode: Some(ModeArg::Call),
            deadline: Some(5),
        };
        let rules = overrides.rules(&Config::default()).unwrap();
        assert!(rules.is_call_level());
        assert_eq!(rules.confirmation_deadline().as_secs(), 5);

        let zero = RuleOverrides {
            mode: None,
            deadline: Some(0),
        };
        assert!(zero.rules(&Config::default()).is_err());
    }

    #[tokio::test]
    async fn test_evaluate_with_fixed_answer() {
        let overrides = RuleOverrides {
            mode: None,
            deadline: None,
        };
        let delete = ActionArgs {
            name: "delete_file".to_string(),
            description: String::new(),
            args: None,
            client: None,
        };

        let permitted = run_evaluate(
            &Config::default(),
            &delete,
            &overrides,
            Some(AnswerArg::Reject),
            OutputFormat::Json,
        )
        .await
        .unwrap();
        assert!(!permitted);

        let permitted = run_evaluate(
            &Config::default(),
            &delete,
            &overrides,
            Some(AnswerArg::Approve),
            OutputFormat::Pretty,
        )
        .await
        .unwrap();
        assert!(permitted);
    }
}
