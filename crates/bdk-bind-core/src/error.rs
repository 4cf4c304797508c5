//! Error types for bdk-bind-core
//!
//! Every failure crossing the boundary becomes a [`BindError`]. Native
//! failures keep the native code and message verbatim and are classified
//! into a closed [`ErrorKind`] by the taxonomy table.

use std::fmt;

use bdk_bind_sys::{LinkageError, ResourceKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::taxonomy::map_error;

/// Result type alias for binding operations
pub type BindResult<T> = Result<T, BindError>;

/// Closed classification of every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or inconsistent descriptor
    Descriptor,
    /// Any other argument the native library rejected
    InvalidInput,
    /// Not enough funds or inputs to satisfy a request
    ResourceExhausted,
    /// Chain source unreachable or misbehaving
    NetworkFailure,
    NotFound,
    /// Fetched chain data does not connect to the local view
    ChainSync,
    Generic,
    /// Call on a released handle; a programming error
    UseAfterFree,
    /// Library or symbol unavailable; never retried
    Linkage,
    /// Native code missing from the taxonomy table
    Unknown,
}

impl ErrorKind {
    /// Get the kind name as used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Descriptor => "Descriptor",
            Self::InvalidInput => "InvalidInput",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::NetworkFailure => "NetworkFailure",
            Self::NotFound => "NotFound",
            Self::ChainSync => "ChainSync",
            Self::Generic => "Generic",
            Self::UseAfterFree => "UseAfterFree",
            Self::Linkage => "Linkage",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether the caller supplied bad input (descriptors included)
    pub fn is_invalid_input(self) -> bool {
        matches!(self, Self::Descriptor | Self::InvalidInput)
    }

    /// Defects that must propagate unmasked
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UseAfterFree | Self::Linkage)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur calling into the native library
#[derive(Debug, Error)]
pub enum BindError {
    /// The native call reported a failure
    #[error("{kind} error [{code}]: {message}")]
    Native {
        kind: ErrorKind,
        code: String,
        message: String,
    },

    /// The handle was already released
    #[error("{resource} used after release")]
    UseAfterFree { resource: ResourceKind },

    /// The native library could not be bound
    #[error(transparent)]
    Linkage(#[from] LinkageError),

    /// A native call broke the contract by returning null
    #[error("Internal error: {operation} returned null")]
    NullPointer { operation: String },

    /// Rejected before reaching the native side
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BindError {
    /// Classify a native failure through the taxonomy table
    pub fn native(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self::Native {
            kind: map_error(&code),
            code,
            message: message.into(),
        }
    }

    /// Create a use-after-free error for `resource`
    pub fn use_after_free(resource: ResourceKind) -> Self {
        Self::UseAfterFree { resource }
    }

    /// Create an error for a native call that returned null
    pub fn null_pointer(operation: impl Into<String>) -> Self {
        Self::NullPointer {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error raised before any native call
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Native { kind, .. } => *kind,
            Self::UseAfterFree { .. } => ErrorKind::UseAfterFree,
            Self::Linkage(_) => ErrorKind::Linkage,
            Self::NullPointer { .. } => ErrorKind::Generic,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Native error code, if the failure came from the library
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Native { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if the error is fatal and must not be retried
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}
