//! Tollgate Telemetry - logging setup for tollgate binaries and hosts.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - An optional separate JSON file for approval audit events
//!
//! # Example
//!
//! ```rust,no_run
//! use tollgate_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tollgate_telemetry::TelemetryError> {
//! let config = LogConfig::new("warn")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("tollgate_approval=debug")
//!     .with_audit_log("/var/log/tollgate");
//!
//! setup_logging(&config)?;
//! tracing::warn!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    AuditLogConfig, DEFAULT_AUDIT_TARGET, FileLogConfig, FileRotation, LogConfig, LogFormat,
    LogTarget, setup_default_logging, setup_logging,
};
