//! Bounded invocation of async operations.
//!
//! [`run_with_deadline`] runs a future for at most a given duration. If the
//! deadline elapses first the future is dropped, which cancels it at its
//! next suspension point, and the caller gets [`Bounded::TimedOut`] back.
//! Errors and panics inside the future are not interpreted here.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Result of a deadline-bounded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bounded<T> {
    /// The operation finished within the deadline.
    Completed(T),
    /// The deadline elapsed and the operation was abandoned.
    TimedOut {
        /// The deadline that was exceeded.
        after: Duration,
    },
}

impl<T> Bounded<T> {
    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// Whether the deadline elapsed.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Run `future` with a deadline.
///
/// `operation` is a short label used in log output only.
///
/// The deadline bounds the whole future: an operation that keeps making
/// progress but does not finish is still cut off. When it is cut off, any
/// work the future spawned onto other threads is not stopped here; only the
/// future itself is dropped.
pub async fn run_with_deadline<F>(
    deadline: Duration,
    operation: &str,
    future: F,
) -> Bounded<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(value) => {
            debug!(operation, "Completed within deadline");
            Bounded::Completed(value)
        },
        Err(_) => {
            warn!(
                operation,
                deadline_secs = deadline.as_secs_f64(),
                "Operation exceeded deadline and was abandoned"
            );
            Bounded::TimedOut { after: deadline }
        },
    }
}
