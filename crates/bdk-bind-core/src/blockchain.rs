//! Electrum chain source

use std::ptr;

use bdk_bind_sys::{FfiElectrumConfig, OpaqueBlockchain};
use tracing::debug;

use crate::config::ElectrumConfig;
use crate::decode::decode;
use crate::error::BindResult;
use crate::handle::OpaqueHandle;
use crate::lifecycle::Dispose;
use crate::string::c_arg;

/// A connected Electrum client
#[derive(Debug)]
pub struct Blockchain {
    pub(crate) handle: OpaqueHandle<OpaqueBlockchain>,
}

impl Blockchain {
    /// Connect to an Electrum server
    ///
    /// Fails with a `NetworkFailure` error if the server is unreachable.
    pub fn connect(config: &ElectrumConfig) -> BindResult<Self> {
        let library = bdk_bind_sys::global()?;
        let url = c_arg(&config.url, "url")?;
        let socks5 = config
            .socks5
            .as_deref()
            .map(|proxy| c_arg(proxy, "socks5"))
            .transpose()?;

        let raw_config = FfiElectrumConfig {
            url: url.as_ptr(),
            socks5: socks5.as_ref().map_or(ptr::null(), |proxy| proxy.as_ptr()),
            retry: config.retry,
            timeout: config.timeout.map_or(-1, i16::from),
            stop_gap: config.stop_gap,
            batch_size: config.batch_size,
        };
        debug!(url = %config.url, retry = config.retry, "connecting to electrum");

        // SAFETY: raw_config and its strings outlive the call
        let raw = unsafe { (library.symbols().bdk_blockchain_new)(&raw_config) };
        let handle = decode(&library, "bdk_blockchain_new", raw, |blockchain| {
            OpaqueHandle::wrap(blockchain, library.clone())
        })?;
        Ok(Self { handle })
    }
}

impl Dispose for Blockchain {
    fn dispose(&self) -> bool {
        self.handle.release()
    }

    fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}
