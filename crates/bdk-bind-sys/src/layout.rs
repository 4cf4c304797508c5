//! Declared struct layouts
//!
//! [`STRUCT_LAYOUTS`] is the single table of every struct that crosses the
//! boundary. At load time each entry is compared with the native library's
//! own description (`bdk_struct_layout`), so a library compiled against a
//! different layout fails with a `LinkageError` instead of corrupting memory.

use std::ffi::CString;
use std::fmt;
use std::mem::{align_of, offset_of, size_of};

use crate::error::LinkageError;
use crate::symbols::Symbols;
use crate::types::*;

/// Maximum number of field offsets a layout can describe
pub const MAX_FIELDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    pub offsets: &'static [usize],
}

macro_rules! layout {
    ($name:literal, $ty:ty, [$($field:ident),* $(,)?]) => {
        StructLayout {
            name: $name,
            size: size_of::<$ty>(),
            align: align_of::<$ty>(),
            offsets: &[$(offset_of!($ty, $field)),*],
        }
    };
}

pub const STRUCT_LAYOUTS: &[StructLayout] = &[
    layout!("FfiError", FfiError, [code, message]),
    layout!("FfiResult<ptr>", FfiResult<*mut OpaqueWallet>, [ok, err]),
    layout!("FfiResult<unit>", FfiResult<FfiUnit>, [ok, err]),
    layout!("FfiResult<bool>", FfiResult<bool>, [ok, err]),
    layout!("FfiResult<FfiBalance>", FfiResult<FfiBalance>, [ok, err]),
    layout!("FfiResult<FfiVec>", FfiResult<FfiVec<FfiLocalUtxo>>, [ok, err]),
    layout!("FfiVec", FfiVec<FfiLocalUtxo>, [ptr, len, cap]),
    layout!(
        "FfiBalance",
        FfiBalance,
        [immature, trusted_pending, untrusted_pending, confirmed]
    ),
    layout!("FfiOutPoint", FfiOutPoint, [txid, vout]),
    layout!("FfiTxOut", FfiTxOut, [value, script_pubkey]),
    layout!("FfiLocalUtxo", FfiLocalUtxo, [outpoint, txout, keychain]),
    layout!("FfiConfirmationTime", FfiConfirmationTime, [height, timestamp]),
    layout!(
        "FfiTransactionDetails",
        FfiTransactionDetails,
        [txid, received, sent, fee, is_confirmed, confirmation_time]
    ),
    layout!(
        "FfiElectrumConfig",
        FfiElectrumConfig,
        [url, socks5, retry, timeout, stop_gap, batch_size]
    ),
    layout!("FfiStructLayout", FfiStructLayout, [size, align, field_count, offsets]),
];

impl StructLayout {
    /// Whether a native description agrees with this declaration
    pub fn matches(&self, native: &FfiStructLayout) -> bool {
        self.size == native.size
            && self.align == native.align
            && self.offsets.len() == native.field_count
            && native.field_count <= MAX_FIELDS
            && self.offsets == &native.offsets[..native.field_count]
    }

    /// Find the declared layout of `name`
    pub fn find(name: &str) -> Option<&'static StructLayout> {
        STRUCT_LAYOUTS.iter().find(|layout| layout.name == name)
    }
}

impl fmt::Display for StructLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={} align={} offsets={:?}",
            self.size, self.align, self.offsets
        )
    }
}

fn describe_native(native: &FfiStructLayout) -> String {
    let count = native.field_count.min(MAX_FIELDS);
    format!(
        "size={} align={} offsets={:?}",
        native.size,
        native.align,
        &native.offsets[..count]
    )
}

/// Query the native description of one struct
///
/// Returns `None` when the library does not know the name.
pub fn native_layout(symbols: &Symbols, name: &str) -> Option<FfiStructLayout> {
    let name = CString::new(name).ok()?;
    let mut out = FfiStructLayout::default();
    // SAFETY: name is NUL terminated and out is a valid, writable layout struct
    let found = unsafe { (symbols.bdk_struct_layout)(name.as_ptr(), &mut out) };
    found.then_some(out)
}

/// Compare every declared layout with the native library
pub fn verify_layouts(symbols: &Symbols) -> Result<(), LinkageError> {
    for declared in STRUCT_LAYOUTS {
        let native = native_layout(symbols, declared.name)
            .ok_or_else(|| LinkageError::UnknownLayout(declared.name.to_string()))?;
        if !declared.matches(&native) {
            return Err(LinkageError::LayoutMismatch {
                name: declared.name.to_string(),
                declared: declared.to_string(),
                native: describe_native(&native),
            });
        }
    }
    Ok(())
}
