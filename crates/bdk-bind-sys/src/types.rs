//! `#[repr(C)]` transit structures shared with the native library
//!
//! Field order, size and alignment of every type here is part of the
//! versioned ABI contract. Changing any of them requires bumping
//! [`ABI_VERSION`](crate::ABI_VERSION) and the matching entry in
//! [`STRUCT_LAYOUTS`](crate::STRUCT_LAYOUTS).

use std::ffi::c_char;
use std::fmt;
use std::marker::{PhantomData, PhantomPinned};
use std::ptr;

macro_rules! opaque_types {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _data: [u8; 0],
                _marker: PhantomData<(*mut u8, PhantomPinned)>,
            }
        )*
    };
}

opaque_types! {
    /// In-memory database configuration owned by the native side
    OpaqueDatabaseConfig;
    /// Native wallet
    OpaqueWallet;
    /// Connected Electrum client
    OpaqueBlockchain;
    /// Pending transaction parameters
    OpaqueTxBuilder;
    /// Partially signed bitcoin transaction
    OpaquePsbt;
}

/// Error descriptor carried by a failed [`FfiResult`].
///
/// Both strings are owned by the enclosing result and released with it.
#[repr(C)]
#[derive(Debug)]
pub struct FfiError {
    pub code: *mut c_char,
    pub message: *mut c_char,
}

/// Tagged ok/err transit value.
///
/// Exactly one side is meaningful: a non-null `err` means the call failed
/// and `ok` is zeroed and unowned.
#[repr(C)]
pub struct FfiResult<T> {
    pub ok: T,
    pub err: *mut FfiError,
}

impl<T: fmt::Debug> fmt::Debug for FfiResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfiResult")
            .field("ok", &self.ok)
            .field("err", &self.err)
            .finish()
    }
}

/// Payload placeholder for calls that return no value
pub type FfiUnit = u8;

/// Contiguous native block of `len` initialized elements
#[repr(C)]
#[derive(Debug)]
pub struct FfiVec<T> {
    pub ptr: *mut T,
    pub len: usize,
    pub cap: usize,
}

impl<T> FfiVec<T> {
    /// An empty block with a null pointer
    pub const fn empty() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }
}

impl<T> Clone for FfiVec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FfiVec<T> {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FfiBalance {
    pub immature: u64,
    pub trusted_pending: u64,
    pub untrusted_pending: u64,
    pub confirmed: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiOutPoint {
    /// Transaction id, hex
    pub txid: *mut c_char,
    pub vout: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiTxOut {
    /// Value in satoshis
    pub value: u64,
    /// Locking script, hex
    pub script_pubkey: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiLocalUtxo {
    pub outpoint: FfiOutPoint,
    pub txout: FfiTxOut,
    /// 0 for external, 1 for internal
    pub keychain: u16,
}

/// Block height and time, both zero while unconfirmed
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FfiConfirmationTime {
    pub height: u32,
    pub timestamp: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiTransactionDetails {
    pub txid: *mut c_char,
    pub received: u64,
    pub sent: u64,
    /// Fee in satoshis, -1 if unknown
    pub fee: i64,
    pub is_confirmed: bool,
    pub confirmation_time: FfiConfirmationTime,
}

/// Electrum connection parameters.
///
/// Borrowed for the duration of the call, never retained by the native side.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiElectrumConfig {
    pub url: *const c_char,
    /// Nullable
    pub socks5: *const c_char,
    pub retry: u8,
    /// Seconds, negative for none
    pub timeout: i16,
    pub stop_gap: u64,
    pub batch_size: u64,
}

/// Layout self-description reported by the native library
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FfiStructLayout {
    pub size: usize,
    pub align: usize,
    pub field_count: usize,
    pub offsets: [usize; 8],
}

/// Which native resource an opaque pointer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DatabaseConfig,
    Wallet,
    Blockchain,
    TxBuilder,
    Psbt,
}

impl ResourceKind {
    /// Get the kind name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DatabaseConfig => "DatabaseConfig",
            Self::Wallet => "Wallet",
            Self::Blockchain => "Blockchain",
            Self::TxBuilder => "TxBuilder",
            Self::Psbt => "Psbt",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
