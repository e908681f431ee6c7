/// Errors raised while constructing descriptors or rule configurations.
///
/// These are reported synchronously at construction time. Nothing that
/// happens after an action has been deemed sensitive surfaces as an
/// `ApprovalError`; those paths resolve to a denial instead.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The action descriptor is malformed (e.g. blank name).
    #[error("invalid action descriptor: {reason}")]
    InvalidDescriptor {
        /// Why the descriptor was rejected.
        reason: String,
    },

    /// A rule configuration field failed validation.
    #[error("invalid rule configuration in '{field}': {message}")]
    InvalidConfiguration {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ApprovalError {
    pub(crate) fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Failure reported by a confirmation port.
///
/// The evaluator logs these and resolves the action to a denial; they are
/// never propagated to the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    /// Reading from or writing to the confirmation surface failed.
    #[error("confirmation I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The person (or the frontend) cancelled the prompt.
    #[error("confirmation cancelled")]
    Cancelled,

    /// The input source was abandoned by an earlier, timed-out prompt and
    /// cannot be reused.
    #[error("confirmation input was abandoned by an earlier timed-out prompt")]
    InputAbandoned,

    /// The frontend is disconnected or otherwise cannot take requests.
    #[error("confirmation frontend unavailable: {0}")]
    Unavailable(String),

    /// Anything else that went wrong inside the port.
    #[error("confirmation port failure: {0}")]
    Internal(String),
}
