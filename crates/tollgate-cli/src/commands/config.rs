//! CLI handlers for the `tollgate config` subcommand.

use anyhow::Result;
use tollgate_config::{ConfigResult, ResolvedConfig, ShowFormat};

use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: &str) -> Result<()> {
    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    let output = resolved
        .show(show_format)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    Ok(())
}

/// Report whether the configuration loaded and validated.
///
/// Returns `false` on error so the caller can set the exit code.
pub(crate) fn validate_config(loaded: &ConfigResult<ResolvedConfig>) -> bool {
    match loaded {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid."));
            if !resolved.loaded_files.is_empty() {
                println!("\nLoaded files:");
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            true
        },
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("Configuration error: {e}")));
            false
        },
    }
}

/// Show the config file paths that are checked and the env fallbacks.
pub(crate) fn show_paths() {
    let home = std::env::var("TOLLGATE_HOME")
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| {
            directories::BaseDirs::new()
                .map(|d| d.home_dir().join(tollgate_config::loader::CONFIG_DIR))
        });
    let workspace = std::env::current_dir()
        .ok()
        .map(|p| p.join(tollgate_config::loader::CONFIG_DIR));

    println!(
        "{}\n",
        Theme::header("Configuration files checked (lowest precedence first):")
    );
    for dir in [home, workspace].into_iter().flatten() {
        let path = dir.join(tollgate_config::loader::CONFIG_FILE);
        let status = if path.exists() { "found" } else { "not found" };
        println!("  {}  [{status}]", path.display());
    }

    println!("\n{}", Theme::header("Environment variable fallbacks:"));
    for var in tollgate_config::env::fallback_vars() {
        println!("  {var}");
    }
}
