//! Wallet storage configuration

use std::path::Path;

use bdk_bind_sys::OpaqueDatabaseConfig;

use crate::decode::decode;
use crate::error::{BindError, BindResult};
use crate::handle::OpaqueHandle;
use crate::lifecycle::Dispose;
use crate::string::c_arg;

/// Where a wallet keeps its state
///
/// A wallet created against a SQLite config is loaded from the file when
/// the file already holds one, and created in it otherwise. Memory configs
/// give every wallet a fresh store that is lost when the wallet is released.
#[derive(Debug)]
pub struct DatabaseConfig {
    pub(crate) handle: OpaqueHandle<OpaqueDatabaseConfig>,
}

impl DatabaseConfig {
    /// In-memory storage
    pub fn memory() -> BindResult<Self> {
        let library = bdk_bind_sys::global()?;
        // SAFETY: takes no arguments; ownership of the result moves to the handle
        let raw = unsafe { (library.symbols().bdk_database_config_memory)() };
        Ok(Self {
            handle: OpaqueHandle::wrap(raw, library)?,
        })
    }

    /// SQLite file at `path`, created on first use
    pub fn sqlite(path: impl AsRef<Path>) -> BindResult<Self> {
        let path = path.as_ref();
        let path = path
            .to_str()
            .ok_or_else(|| BindError::invalid_input(format!("path is not UTF-8: {}", path.display())))?;
        let library = bdk_bind_sys::global()?;
        let path = c_arg(path, "path")?;
        // SAFETY: path is NUL terminated and outlives the call
        let raw = unsafe { (library.symbols().bdk_database_config_sqlite)(path.as_ptr()) };
        decode(&library, "bdk_database_config_sqlite", raw, |config| {
            Ok(Self {
                handle: OpaqueHandle::wrap(config, library.clone())?,
            })
        })
    }
}

impl Dispose for DatabaseConfig {
    fn dispose(&self) -> bool {
        self.handle.release()
    }

    fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}
