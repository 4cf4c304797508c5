//! Electrum chain source

use std::sync::Once;

use bdk_electrum::BdkElectrumClient;
use bdk_electrum::electrum_client::{self, ConfigBuilder, Socks5Config};
use tracing::debug;

use crate::abi::{FfiElectrumConfig, FfiResult};
use crate::alloc::{boxed, unbox};
use crate::result::{NativeError, NativeResult, arg_str, opt_arg_str, respond};

pub struct Blockchain {
    pub client: BdkElectrumClient<electrum_client::Client>,
    pub stop_gap: usize,
    pub batch_size: usize,
}

fn install_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

unsafe fn connect(config: *const FfiElectrumConfig) -> NativeResult<Blockchain> {
    // SAFETY: config is null or points to a caller-owned struct valid for this call
    let config = unsafe { config.as_ref() }
        .ok_or_else(|| NativeError::new("NullArgument", "config is null"))?;
    // SAFETY: strings inside config are borrowed for this call only
    let url = unsafe { arg_str(config.url, "url") }?;
    let socks5 = unsafe { opt_arg_str(config.socks5, "socks5") }?;

    let timeout = u8::try_from(config.timeout).ok();
    let builder = ConfigBuilder::new()
        .retry(config.retry)
        .timeout(timeout)
        .socks5(socks5.map(Socks5Config::new));

    install_crypto_provider();
    debug!(url, retry = config.retry, ?timeout, "connecting to electrum");
    let client = electrum_client::Client::from_config(url, builder.build())
        .map_err(|e| NativeError::new("Electrum", e))?;

    Ok(Blockchain {
        client: BdkElectrumClient::new(client),
        stop_gap: usize::try_from(config.stop_gap).unwrap_or(usize::MAX).max(1),
        batch_size: usize::try_from(config.batch_size).unwrap_or(usize::MAX).max(1),
    })
}

/// # Safety
/// `config` must be null or point to a valid `FfiElectrumConfig` whose
/// strings are NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_blockchain_new(
    config: *const FfiElectrumConfig,
) -> *mut FfiResult<*mut Blockchain> {
    // SAFETY: per caller contract
    respond(|| unsafe { connect(config) }.map(boxed))
}

/// # Safety
/// `blockchain` must be null or a live pointer from `bdk_blockchain_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_blockchain_free(blockchain: *mut Blockchain) {
    // SAFETY: per caller contract
    drop(unsafe { unbox(blockchain) });
}
