//! Contract entry points: ABI revision, layout self-description, allocation count

use std::ffi::{CStr, c_char, c_void};
use std::mem::{align_of, offset_of, size_of};

use crate::abi::*;
use crate::alloc::{free_c_string, live};
use crate::blockchain::Blockchain;
use crate::database::DatabaseConfig;
use crate::psbt::PsbtState;
use crate::result::free_result;
use crate::wallet::WalletState;

macro_rules! describe {
    ($ty:ty, [$($field:ident),* $(,)?]) => {{
        let fields = [$(offset_of!($ty, $field)),*];
        let mut offsets = [0usize; 8];
        offsets[..fields.len()].copy_from_slice(&fields);
        FfiStructLayout {
            size: size_of::<$ty>(),
            align: align_of::<$ty>(),
            field_count: fields.len(),
            offsets,
        }
    }};
}

fn describe(name: &str) -> Option<FfiStructLayout> {
    let layout = match name {
        "FfiError" => describe!(FfiError, [code, message]),
        "FfiResult<ptr>" => describe!(FfiResult<*mut c_void>, [ok, err]),
        "FfiResult<unit>" => describe!(FfiResult<FfiUnit>, [ok, err]),
        "FfiResult<bool>" => describe!(FfiResult<bool>, [ok, err]),
        "FfiResult<FfiBalance>" => describe!(FfiResult<FfiBalance>, [ok, err]),
        "FfiResult<FfiVec>" => describe!(FfiResult<FfiVec<FfiLocalUtxo>>, [ok, err]),
        "FfiVec" => describe!(FfiVec<FfiLocalUtxo>, [ptr, len, cap]),
        "FfiBalance" => describe!(
            FfiBalance,
            [immature, trusted_pending, untrusted_pending, confirmed]
        ),
        "FfiOutPoint" => describe!(FfiOutPoint, [txid, vout]),
        "FfiTxOut" => describe!(FfiTxOut, [value, script_pubkey]),
        "FfiLocalUtxo" => describe!(FfiLocalUtxo, [outpoint, txout, keychain]),
        "FfiConfirmationTime" => describe!(FfiConfirmationTime, [height, timestamp]),
        "FfiTransactionDetails" => describe!(
            FfiTransactionDetails,
            [txid, received, sent, fee, is_confirmed, confirmation_time]
        ),
        "FfiElectrumConfig" => describe!(
            FfiElectrumConfig,
            [url, socks5, retry, timeout, stop_gap, batch_size]
        ),
        "FfiStructLayout" => describe!(FfiStructLayout, [size, align, field_count, offsets]),
        _ => return None,
    };
    Some(layout)
}

#[unsafe(no_mangle)]
pub extern "C" fn bdk_abi_version() -> u32 {
    ABI_VERSION
}

/// Write the compiled layout of `name` into `out`
///
/// # Safety
/// `name` must be null or NUL terminated; `out` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_struct_layout(name: *const c_char, out: *mut FfiStructLayout) -> bool {
    if name.is_null() || out.is_null() {
        return false;
    }
    // SAFETY: per caller contract
    let Ok(name) = unsafe { CStr::from_ptr(name) }.to_str() else {
        return false;
    };
    match describe(name) {
        Some(layout) => {
            // SAFETY: out is non-null and writable per caller contract
            unsafe { out.write(layout) };
            true
        }
        None => false,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bdk_live_allocations() -> u64 {
    live()
}

/// # Safety
/// `string` must be null or a string returned by this library, not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bdk_string_free(string: *mut c_char) {
    // SAFETY: per caller contract
    unsafe { free_c_string(string) }
}

macro_rules! result_frees {
    ($($name:ident: $payload:ty;)*) => {
        $(
            /// Free the transit struct and its error, never the payload
            ///
            /// # Safety
            /// `result` must be null or returned by this library, not yet freed.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $name(result: *mut FfiResult<$payload>) {
                // SAFETY: per caller contract
                unsafe { free_result(result) }
            }
        )*
    };
}

result_frees! {
    bdk_result_free_database: *mut DatabaseConfig;
    bdk_result_free_wallet: *mut WalletState;
    bdk_result_free_blockchain: *mut Blockchain;
    bdk_result_free_psbt: *mut PsbtState;
    bdk_result_free_string: *mut c_char;
    bdk_result_free_unit: FfiUnit;
    bdk_result_free_bool: bool;
    bdk_result_free_balance: FfiBalance;
    bdk_result_free_utxos: FfiVec<FfiLocalUtxo>;
    bdk_result_free_transactions: FfiVec<FfiTransactionDetails>;
}
