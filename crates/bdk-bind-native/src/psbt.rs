//! Partially signed transactions

use std::ffi::c_char;
use std::str::FromStr;

use bdk_wallet::bitcoin::Psbt;
use parking_lot::Mutex;

use crate::abi::FfiResult;
use crate::alloc::{boxed, c_string, unbox};
use crate::result::{NativeError, arg_str, respond};

pub struct PsbtState {
    pub psbt: Mutex<Psbt>,
}

impl PsbtState {
    pub fn new(psbt: Psbt) -> Self {
        Self {
            psbt: Mutex::new(psbt),
        }
    }
}

/// # Safety
/// `base64` must be null or NUL terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_psbt_from_base64(base64: *const c_char) -> *mut FfiResult<*mut PsbtState> {
    respond(|| {
        // SAFETY: per caller contract
        let text = unsafe { arg_str(base64, "base64") }?;
        Psbt::from_str(text)
            .map(|psbt| boxed(PsbtState::new(psbt)))
            .map_err(|e| NativeError::new("PsbtParse", e))
    })
}

/// # Safety
/// `psbt` must be null or a live pointer from a PSBT constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_psbt_free(psbt: *mut PsbtState) {
    // SAFETY: per caller contract
    drop(unsafe { unbox(psbt) });
}

/// Base64 text of the PSBT, or null for a null handle
///
/// # Safety
/// `psbt` must be null or a live pointer from a PSBT constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_psbt_serialize(psbt: *mut PsbtState) -> *mut c_char {
    // SAFETY: per caller contract
    match unsafe { psbt.as_ref() } {
        Some(state) => c_string(state.psbt.lock().to_string()),
        None => std::ptr::null_mut(),
    }
}

/// Txid of the unsigned transaction, or null for a null handle
///
/// # Safety
/// `psbt` must be null or a live pointer from a PSBT constructor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_psbt_txid(psbt: *mut PsbtState) -> *mut c_char {
    // SAFETY: per caller contract
    match unsafe { psbt.as_ref() } {
        Some(state) => c_string(state.psbt.lock().unsigned_tx.compute_txid().to_string()),
        None => std::ptr::null_mut(),
    }
}
