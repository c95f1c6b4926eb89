use thiserror::Error;

/// Failure taxonomy seen by the state machines.
///
/// The engine's transport errors are mapped onto these by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("request aborted")]
    Aborted,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("{0}")]
    ValidationFailure(String),
}

impl SyncError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
