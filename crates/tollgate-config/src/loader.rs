//! Config file discovery and layered loading.
//!
//! [`load`] builds the configuration in this order:
//! 1. Parse embedded `defaults.toml`
//! 2. Merge the user file (`$TOLLGATE_HOME/config.toml`, else
//!    `~/.tollgate/config.toml`)
//! 3. Merge `{workspace}/.tollgate/config.toml`, then revert anything that
//!    loosened the rules
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{
    ConfigLayer, FieldSources, deep_merge_tracking, enforce_restrictions, record_leaves,
};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Directory name used under home and workspace roots.
pub const CONFIG_DIR: &str = ".tollgate";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Load the layered configuration.
///
/// `workspace_root` is the project directory; `None` skips the workspace
/// layer. `tollgate_home` replaces user config discovery: its
/// `config.toml` is used as the user layer.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is unreadable, too large or
/// malformed, or if the merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    tollgate_home: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    load_with_env(workspace_root, tollgate_home, &env_vars)
}

pub(crate) fn load_with_env(
    workspace_root: Option<&Path>,
    tollgate_home: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let (mut merged, mut field_sources) = parse_defaults()?;
    let mut loaded_files = Vec::new();

    // User layer.
    let user_dir = match tollgate_home {
        Some(dir) => dir.to_path_buf(),
        None => match env_vars.get("TOLLGATE_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => home_directory()?.join(CONFIG_DIR),
        },
    };
    let user_path = user_dir.join(CONFIG_FILE);
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // Workspace layer. The pre-workspace tree is the baseline it may only
    // tighten.
    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(CONFIG_DIR).join(CONFIG_FILE);
        if let Some(overlay) = try_load_file(&ws_path)? {
            let baseline = merged.clone();
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                &ConfigLayer::Workspace,
                &mut field_sources,
            );
            enforce_restrictions(&mut merged, &baseline, &overlay);
            loaded_files.push(ws_path.display().to_string());
            info!(path = %ws_path.display(), "loaded workspace config");
        }
    }

    finish(merged, field_sources, loaded_files, env_vars)
}

/// Load defaults plus one explicit file, then env fallbacks.
///
/// Used for `--config PATH`. User and workspace files are not consulted.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, too large
/// or malformed, or if the result fails validation.
pub fn load_explicit(path: &Path) -> ConfigResult<ResolvedConfig> {
    let (mut merged, mut field_sources) = parse_defaults()?;

    let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
    })?;
    deep_merge_tracking(
        &mut merged,
        &overlay,
        "",
        &ConfigLayer::File,
        &mut field_sources,
    );

    finish(
        merged,
        field_sources,
        vec![path.display().to_string()],
        &collect_env_vars(),
    )
}

/// Load a config from a single file, without defaults.toml, env vars or
/// other layers. Missing fields take their `Default` values.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_limited(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

fn parse_defaults() -> ConfigResult<(toml::Value, FieldSources)> {
    let merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut field_sources = FieldSources::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);
    Ok((merged, field_sources))
}

fn finish(
    mut merged: toml::Value,
    mut field_sources: FieldSources,
    loaded_files: Vec<String>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Read a file, returning `None` if it doesn't exist.
///
/// The size is checked on the content actually read, not a prior stat.
fn read_limited(path: &Path) -> ConfigResult<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    Ok(Some(content))
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let Some(content) = read_limited(path)? else {
        return Ok(None);
    };

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvaluationMode, OnTimeout};
    use std::fs;

    fn write_config(dir: &Path, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(CONFIG_FILE), content).unwrap();
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_defaults_only() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(None, Some(home.path()), &no_env()).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("approval.mode"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_user_then_workspace() {
        let home = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        write_config(
            home.path(),
            r#"
            [approval]
            confirmation_deadline_secs = 60
            sensitive_keywords = ["delete"]
            "#,
        );
        write_config(
            &ws.path().join(CONFIG_DIR),
            r#"
            [approval]
            mode = "call"
            confirmation_deadline_secs = 10
            sensitive_keywords = ["deploy"]

            [approval.argument_rules.deploy]
            env = ["prod"]
            "#,
        );

        let resolved = load_with_env(Some(ws.path()), Some(home.path()), &no_env()).unwrap();
        let approval = &resolved.config.approval;

        assert_eq!(approval.mode, EvaluationMode::Call);
        assert_eq!(approval.confirmation_deadline_secs, 10);
        assert!(approval.sensitive_keywords.contains(&"delete".to_owned()));
        assert!(approval.sensitive_keywords.contains(&"deploy".to_owned()));
        assert_eq!(approval.argument_rules["deploy"]["env"], vec!["prod"]);
        assert_eq!(resolved.loaded_files.len(), 2);
        assert_eq!(
            resolved.field_sources.get("approval.mode"),
            Some(&ConfigLayer::Workspace)
        );
    }

    #[test]
    fn test_workspace_cannot_loosen() {
        let home = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        write_config(
            &ws.path().join(CONFIG_DIR),
            r#"
            [approval]
            on_timeout = "approve"
            confirmation_deadline_secs = 3600
            sensitive_keywords = []
            "#,
        );

        let resolved = load_with_env(Some(ws.path()), Some(home.path()), &no_env()).unwrap();
        let approval = &resolved.config.approval;
        assert_eq!(approval.on_timeout, OnTimeout::Deny);
        assert_eq!(approval.confirmation_deadline_secs, 30);
        assert!(approval.sensitive_keywords.contains(&"delete".to_owned()));
    }

    #[test]
    fn test_user_may_opt_into_auto_approve() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[approval]\non_timeout = \"approve\"\n");
        let resolved = load_with_env(None, Some(home.path()), &no_env()).unwrap();
        assert_eq!(resolved.config.approval.on_timeout, OnTimeout::Approve);
    }

    #[test]
    fn test_tollgate_home_env() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[logging]\nlevel = \"debug\"\n");

        let mut env = no_env();
        env.insert(
            "TOLLGATE_HOME".to_owned(),
            home.path().display().to_string(),
        );
        let resolved = load_with_env(None, None, &env).unwrap();
        assert_eq!(resolved.config.logging.level, "debug");
    }

    #[test]
    fn test_env_fallback_applies_over_defaults_only() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[logging]\nlevel = \"error\"\n");

        let mut env = no_env();
        env.insert("TOLLGATE_LOG_LEVEL".to_owned(), "debug".to_owned());
        env.insert("TOLLGATE_APPROVAL_DEADLINE_SECS".to_owned(), "15".to_owned());

        let resolved = load_with_env(None, Some(home.path()), &env).unwrap();
        assert_eq!(resolved.config.logging.level, "error");
        assert_eq!(resolved.config.approval.confirmation_deadline_secs, 15);
        assert_eq!(
            resolved
                .field_sources
                .get("approval.confirmation_deadline_secs"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[approval]\nconfirmation_deadline_secs = 0\n");
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));

        write_config(home.path(), "[approval]\nmode = \"everything\"\n");
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[approval\n");
        let result = load_with_env(None, Some(home.path()), &no_env());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.toml");
        let padding = "#".repeat(usize::try_from(MAX_CONFIG_FILE_SIZE).unwrap());
        fs::write(&path, format!("{padding}\n")).unwrap();

        assert!(matches!(
            read_limited(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.toml");
        fs::write(&path, "[approval]\nmode = \"call\"\n").unwrap();

        let resolved = load_explicit(&path).unwrap();
        assert_eq!(resolved.config.approval.mode, EvaluationMode::Call);
        assert_eq!(
            resolved.field_sources.get("approval.mode"),
            Some(&ConfigLayer::File)
        );

        let missing = load_explicit(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_file_without_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.toml");
        fs::write(&path, "[approval]\nsensitive_keywords = [\"wipe\"]\n").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.approval.sensitive_keywords, vec!["wipe"]);
        assert_eq!(config.approval.confirmation_deadline_secs, 30);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let result = try_load_file(Path::new("/nonexistent/tollgate/config.toml")).unwrap();
        assert!(result.is_none());
    }
}
