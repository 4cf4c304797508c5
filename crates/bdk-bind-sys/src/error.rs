//! Linkage failures
//!
//! A `LinkageError` means the process cannot talk to the native library at
//! all. It is cached by the global binding and returned unchanged on every
//! later attempt, so it must be `Clone`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkageError {
    /// The shared object could not be opened
    #[error("Failed to load native library {path}: {message}")]
    LibraryLoad { path: String, message: String },

    /// A declared entry point is not exported
    #[error("Native symbol `{0}` not found")]
    MissingSymbol(String),

    /// The library was built against another ABI revision
    #[error("ABI version mismatch: bindings expect {expected}, library reports {found}")]
    AbiVersion { expected: u32, found: u32 },

    /// The library does not describe a declared struct
    #[error("Native library does not describe struct {0}")]
    UnknownLayout(String),

    /// Size, alignment or field offsets disagree
    #[error("Layout mismatch for {name}: declared {declared}, native {native}")]
    LayoutMismatch {
        name: String,
        declared: String,
        native: String,
    },
}

impl LinkageError {
    /// Create a missing symbol error
    pub fn missing_symbol(name: impl Into<String>) -> Self {
        Self::MissingSymbol(name.into())
    }

    /// Create a library load error
    pub fn library_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LibraryLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}
