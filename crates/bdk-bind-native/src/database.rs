//! Database configuration handles
//!
//! Both variants open a SQLite store; the memory variant opens a private
//! in-memory connection per wallet, so its state dies with the wallet.

use std::ffi::c_char;
use std::path::PathBuf;

use bdk_wallet::rusqlite::Connection;

use crate::abi::FfiResult;
use crate::alloc::{boxed, unbox};
use crate::result::{NativeError, NativeResult, arg_str, respond};

/// Where a wallet keeps its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// Nothing persisted; the wallet lives only as long as its handle
    Memory,
    /// SQLite file, created on first use
    Sqlite { path: PathBuf },
}

impl DatabaseConfig {
    /// Open a connection to the configured store
    pub fn open(&self) -> NativeResult<Connection> {
        let connection = match self {
            Self::Memory => Connection::open_in_memory(),
            Self::Sqlite { path } => Connection::open(path),
        };
        connection.map_err(|e| NativeError::new("Persist", e))
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bdk_database_config_memory() -> *mut DatabaseConfig {
    boxed(DatabaseConfig::Memory)
}

/// # Safety
/// `path` must be null or NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_database_config_sqlite(
    path: *const c_char,
) -> *mut FfiResult<*mut DatabaseConfig> {
    respond(|| {
        // SAFETY: per caller contract
        let path = unsafe { arg_str(path, "path") }?;
        if path.trim().is_empty() {
            return Err(NativeError::new("InvalidPath", "path is empty"));
        }
        Ok(boxed(DatabaseConfig::Sqlite { path: path.into() }))
    })
}

/// # Safety
/// `config` must be null or a live pointer from a database config constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_database_config_free(config: *mut DatabaseConfig) {
    // SAFETY: per caller contract
    drop(unsafe { unbox(config) });
}
