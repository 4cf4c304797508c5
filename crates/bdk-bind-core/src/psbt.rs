//! Partially signed bitcoin transactions

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bdk_bind_sys::{NativeLibrary, OpaquePsbt};

use crate::decode::decode;
use crate::error::{BindError, BindResult};
use crate::handle::OpaqueHandle;
use crate::lifecycle::Dispose;
use crate::string::{c_arg, take_string};

pub struct Psbt {
    pub(crate) handle: OpaqueHandle<OpaquePsbt>,
}

impl Psbt {
    /// Parse a base64 encoded PSBT
    pub fn from_base64(base64: &str) -> BindResult<Self> {
        let library = bdk_bind_sys::global()?;
        let text = c_arg(base64, "psbt")?;
        // SAFETY: text is NUL terminated and outlives the call
        let raw = unsafe { (library.symbols().bdk_psbt_from_base64)(text.as_ptr()) };
        decode(&library, "bdk_psbt_from_base64", raw, |psbt| {
            Self::from_raw(psbt, library.clone())
        })
    }

    pub(crate) fn from_raw(raw: *mut OpaquePsbt, library: Arc<NativeLibrary>) -> BindResult<Self> {
        Ok(Self {
            handle: OpaqueHandle::wrap(raw, library)?,
        })
    }

    /// Base64 encoding
    pub fn serialize(&self) -> BindResult<String> {
        self.handle.with(|library, psbt| {
            // SAFETY: psbt is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_psbt_serialize)(psbt) };
            // SAFETY: an owned string from this library, or null
            unsafe { take_string(raw, library, "bdk_psbt_serialize") }
        })
    }

    /// Id of the unsigned transaction
    pub fn txid(&self) -> BindResult<String> {
        self.handle.with(|library, psbt| {
            // SAFETY: psbt is live while the handle is held
            let raw = unsafe { (library.symbols().bdk_psbt_txid)(psbt) };
            // SAFETY: an owned string from this library, or null
            unsafe { take_string(raw, library, "bdk_psbt_txid") }
        })
    }
}

impl FromStr for Psbt {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl Dispose for Psbt {
    fn dispose(&self) -> bool {
        self.handle.release()
    }

    fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}

impl fmt::Debug for Psbt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Psbt").field("handle", &self.handle).finish()
    }
}
