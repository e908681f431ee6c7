//! Confirmation ports.
//!
//! A [`ConfirmationPort`] asks someone (or something) whether a sensitive
//! action may run. Frontends (terminal, chat, web) implement it to provide
//! their own confirmation UX; the evaluator only ever sees the trait.
//!
//! Ports do not enforce deadlines. The evaluator bounds every call with the
//! configured confirmation deadline and drops the pending future when it
//! elapses, so an implementation should hold its resources in values that
//! release them on drop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::ActionDescriptor;
use crate::error::ConfirmationError;

/// Asks for a yes/no decision on a sensitive action.
///
/// # Example
///
/// ```
/// use tollgate_approval::{ActionDescriptor, ConfirmationError, ConfirmationPort};
///
/// struct AllowReads;
///
/// #[async_trait::async_trait]
/// impl ConfirmationPort for AllowReads {
///     async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
///         Ok(action.name().starts_with("read_"))
///     }
///
///     fn name(&self) -> &str {
///         "allow-reads"
///     }
/// }
/// ```
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// Present the action and wait for a decision.
    ///
    /// `Ok(true)` approves, `Ok(false)` rejects. Errors are treated as a
    /// rejection by the evaluator.
    async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError>;

    /// Short name for logs and audit records.
    fn name(&self) -> &str;

    /// Whether the port can currently take requests.
    ///
    /// An unavailable port is not asked at all; the action is denied.
    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl<P: ConfirmationPort + ?Sized> ConfirmationPort for Arc<P> {
    async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
        (**self).confirm(action).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// A port backed by a synchronous closure.
///
/// Handy for embedding fixed policies and for tests. The closure runs on the
/// evaluating task, so it must not block.
pub struct FnPort<F> {
    name: String,
    decide: F,
}

impl<F> FnPort<F>
where
    F: Fn(&ActionDescriptor) -> Result<bool, ConfirmationError> + Send + Sync,
{
    /// Wrap `decide` as a port called `name`.
    pub fn new(name: impl Into<String>, decide: F) -> Self {
        Self {
            name: name.into(),
            decide,
        }
    }
}

/// Build a [`FnPort`] from a closure.
pub fn from_fn<F>(name: impl Into<String>, decide: F) -> FnPort<F>
where
    F: Fn(&ActionDescriptor) -> Result<bool, ConfirmationError> + Send + Sync,
{
    FnPort::new(name, decide)
}

#[async_trait]
impl<F> ConfirmationPort for FnPort<F>
where
    F: Fn(&ActionDescriptor) -> Result<bool, ConfirmationError> + Send + Sync,
{
    async fn confirm(&self, action: &ActionDescriptor) -> Result<bool, ConfirmationError> {
        (self.decide)(action)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnPort<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPort").field("name", &self.name).finish()
    }
}
