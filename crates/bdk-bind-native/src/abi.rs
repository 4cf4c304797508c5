//! Library-side definitions of the exported structures
//!
//! These are written independently of the host bindings. Both sides agree
//! only through `bdk_struct_layout`, which reports what this build actually
//! compiled.

use std::ffi::c_char;

pub const ABI_VERSION: u32 = 2;

#[repr(C)]
pub struct FfiError {
    pub code: *mut c_char,
    pub message: *mut c_char,
}

#[repr(C)]
pub struct FfiResult<T> {
    pub ok: T,
    pub err: *mut FfiError,
}

pub type FfiUnit = u8;

#[repr(C)]
pub struct FfiVec<T> {
    pub ptr: *mut T,
    pub len: usize,
    pub cap: usize,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
pub struct FfiBalance {
    pub immature: u64,
    pub trusted_pending: u64,
    pub untrusted_pending: u64,
    pub confirmed: u64,
}

#[repr(C)]
pub struct FfiOutPoint {
    pub txid: *mut c_char,
    pub vout: u32,
}

#[repr(C)]
pub struct FfiTxOut {
    pub value: u64,
    pub script_pubkey: *mut c_char,
}

#[repr(C)]
pub struct FfiLocalUtxo {
    pub outpoint: FfiOutPoint,
    pub txout: FfiTxOut,
    pub keychain: u16,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
pub struct FfiConfirmationTime {
    pub height: u32,
    pub timestamp: u64,
}

#[repr(C)]
pub struct FfiTransactionDetails {
    pub txid: *mut c_char,
    pub received: u64,
    pub sent: u64,
    pub fee: i64,
    pub is_confirmed: bool,
    pub confirmation_time: FfiConfirmationTime,
}

#[repr(C)]
pub struct FfiElectrumConfig {
    pub url: *const c_char,
    pub socks5: *const c_char,
    pub retry: u8,
    pub timeout: i16,
    pub stop_gap: u64,
    pub batch_size: u64,
}

#[repr(C)]
#[derive(Default)]
pub struct FfiStructLayout {
    pub size: usize,
    pub align: usize,
    pub field_count: usize,
    pub offsets: [usize; 8],
}

/// Value stored in `ok` when a call fails
pub trait Blank {
    fn blank() -> Self;
}

impl<T> Blank for *mut T {
    fn blank() -> Self {
        std::ptr::null_mut()
    }
}

impl Blank for FfiUnit {
    fn blank() -> Self {
        0
    }
}

impl Blank for bool {
    fn blank() -> Self {
        false
    }
}

impl Blank for FfiBalance {
    fn blank() -> Self {
        Self::default()
    }
}

impl<T> Blank for FfiVec<T> {
    fn blank() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }
}
