//! Deep merge of TOML values with restriction enforcement.
//!
//! Merging works on raw [`toml::Value`] trees, not deserialized structs, so
//! a key missing from a file never overrides a lower layer with its default.

mod deep;
mod path;
mod restrict;

use std::collections::HashMap;

pub(crate) use deep::record_leaves;
pub use deep::{deep_merge, deep_merge_tracking};
pub use restrict::enforce_restrictions;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.tollgate/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.tollgate/config.toml`).
    Workspace,
    /// Explicit file given on the command line.
    File,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user"),
            Self::Workspace => write!(f, "workspace"),
            Self::File => write!(f, "file"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Tracks which layer set each field's value, by dotted path.
pub type FieldSources = HashMap<String, ConfigLayer>;
