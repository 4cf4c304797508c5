//! Error types for the executor

use bdk_bind_core::{BindError, ErrorKind};
use thiserror::Error;

/// Result type alias for executor operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur running a job on the executor
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The job ran and the binding reported an error
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Gave up waiting; the job may still be running
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// `try_run` found the queue at capacity
    #[error("Executor queue is full")]
    QueueFull,

    #[error("Executor is shut down")]
    ShutDown,

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

impl RuntimeError {
    /// Error kind of the binding failure, if the job itself failed
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Bind(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Check if the error is fatal
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bind(e) if e.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdk_bind_core::ResourceKind;

    #[test]
    fn test_bind_error_is_transparent() {
        let err = RuntimeError::from(BindError::native("Electrum", "connection refused"));
        assert_eq!(err.to_string(), "NetworkFailure error [Electrum]: connection refused");
        assert_eq!(err.kind(), Some(ErrorKind::NetworkFailure));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_passes_through() {
        let err = RuntimeError::from(BindError::use_after_free(ResourceKind::Wallet));
        assert!(err.is_fatal());
        assert_eq!(RuntimeError::Timeout(250).kind(), None);
        assert_eq!(RuntimeError::Timeout(250).to_string(), "Timed out after 250ms");
    }
}
