//! Tollgate CLI - ask before an agent's sensitive tool call runs.
//!
//! Classifies a proposed tool call against the configured rules and, when
//! it is sensitive, asks for confirmation on the terminal. Exit status is
//! `0` when the call may run and `2` when it is denied.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod config_bridge;
mod theme;

use commands::evaluate::{ActionArgs, AnswerArg, OutputFormat, RuleOverrides};
use commands::{check, config, evaluate};
use tollgate_config::{ConfigResult, ResolvedConfig};

/// Exit status for a denied action.
const EXIT_DENIED: u8 = 2;

/// Tollgate - policy gate for agent tool calls
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the user and workspace files
    #[arg(long, global = true, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one tool call, prompting if it is sensitive
    Evaluate {
        #[command(flatten)]
        action: ActionArgs,

        #[command(flatten)]
        overrides: RuleOverrides,

        /// Answer every confirmation without prompting
        #[arg(long, value_enum)]
        answer: Option<AnswerArg>,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Classify one tool call without prompting
    Classify {
        #[command(flatten)]
        action: ActionArgs,

        #[command(flatten)]
        overrides: RuleOverrides,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Gate a JSON list of tool calls (one agent turn)
    Check {
        /// JSON file with the calls, or `-` for stdin
        calls: PathBuf,

        #[command(flatten)]
        overrides: RuleOverrides,

        /// Answer every confirmation without prompting
        #[arg(long, value_enum)]
        answer: Option<AnswerArg>,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show {
        /// Output format: toml (default) or json
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Check that the configuration loads and validates
    Validate,
    /// List the config files and env vars consulted
    Paths,
}

fn load_config(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    match explicit {
        Some(path) => tollgate_config::loader::load_explicit(path),
        None => {
            let workspace_root = std::env::current_dir().ok();
            tollgate_config::Config::load(workspace_root.as_deref())
        },
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));

    // A timed-out terminal prompt leaves its blocking stdin read running.
    // Waiting for it on shutdown would hang until the next line of input.
    runtime.shutdown_background();

    result
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let loaded = load_config(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = match &loaded {
        Ok(resolved) => {
            let mut lc = config_bridge::to_log_config(&resolved.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            // Fallback if config loading fails.
            let level = if cli.verbose { "debug" } else { "warn" };
            tollgate_telemetry::LogConfig::new(level)
                .with_format(tollgate_telemetry::LogFormat::Compact)
        },
    };
    if let Err(e) = tollgate_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "Configuration failed to load");
    }

    match cli.command {
        Commands::Evaluate {
            action,
            overrides,
            answer,
            format,
        } => {
            let resolved = loaded?;
            let permitted =
                evaluate::run_evaluate(&resolved.config, &action, &overrides, answer, format)
                    .await?;
            Ok(verdict_status(permitted))
        },
        Commands::Classify {
            action,
            overrides,
            format,
        } => {
            let resolved = loaded?;
            evaluate::run_classify(&resolved.config, &action, &overrides, format)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Check {
            calls,
            overrides,
            answer,
            format,
        } => {
            let resolved = loaded?;
            let all_permitted =
                check::run_check(&resolved.config, &calls, &overrides, answer, format).await?;
            Ok(verdict_status(all_permitted))
        },
        Commands::Config { command } => handle_config(command, loaded),
    }
}

fn verdict_status(permitted: bool) -> ExitCode {
    if permitted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_DENIED)
    }
}

fn handle_config(
    command: ConfigCommands,
    loaded: ConfigResult<ResolvedConfig>,
) -> Result<ExitCode> {
    match command {
        ConfigCommands::Show { format } => {
            config::show_config(&loaded?, &format)?;
            Ok(ExitCode::SUCCESS)
        },
        ConfigCommands::Validate => {
            if config::validate_config(&loaded) {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        },
        ConfigCommands::Paths => {
            config::show_paths();
            Ok(ExitCode::SUCCESS)
        },
    }
}
