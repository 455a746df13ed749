use std::collections::TryReserveError;

/// Errors surfaced by command recording and backend lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// Feature intentionally left unsupported by this backend.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// A fixed-capacity limit was exceeded; reports what was asked for
    /// against what the backend can hold.
    #[error("{message}; requested {requested} vs. maximal {maximal}")]
    ResourceExhausted {
        message: String,
        requested: usize,
        maximal: usize,
    },

    /// Unsupported numeric configuration reachable only via caller misuse.
    #[error("internal error: {0}")]
    Internal(String),

    /// An underlying device/driver call failed.
    #[error("{call} failed: {name} ({code})")]
    BackendCall {
        call: &'static str,
        code: i32,
        name: String,
    },

    /// Arena or resource-set growth failed.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// The HIP runtime library could not be loaded or initialized.
    #[error("HIP runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

impl From<TryReserveError> for HalError {
    fn from(err: TryReserveError) -> Self {
        HalError::Allocation(err.to_string())
    }
}

pub type HalResult<T> = Result<T, HalError>;
