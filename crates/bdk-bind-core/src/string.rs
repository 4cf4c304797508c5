//! String conversion across the boundary
//!
//! Host strings go out as temporary NUL terminated copies that live for one
//! call. Native strings come back as [`NativeString`], released with
//! `bdk_string_free` when dropped.

use std::ffi::{CStr, CString, c_char};
use std::ptr::NonNull;

use bdk_bind_sys::NativeLibrary;

use crate::error::{BindError, BindResult};

/// Owned string allocated by the native library
pub struct NativeString<'lib> {
    raw: NonNull<c_char>,
    library: &'lib NativeLibrary,
}

impl<'lib> NativeString<'lib> {
    /// Take ownership of a native string
    ///
    /// Returns `None` if `raw` is null.
    ///
    /// # Safety
    /// `raw` must be null or a NUL terminated string allocated by `library`
    /// and not yet freed. Ownership moves to the returned value.
    pub unsafe fn from_raw(raw: *mut c_char, library: &'lib NativeLibrary) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw, library })
    }

    /// Borrow the native bytes
    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: raw is a live NUL terminated string owned by self
        unsafe { CStr::from_ptr(self.raw.as_ptr()) }
    }

    /// Borrow as UTF-8
    pub fn to_str(&self) -> BindResult<&str> {
        self.as_c_str()
            .to_str()
            .map_err(|e| BindError::native("Utf8", format!("native string is not UTF-8: {e}")))
    }

    /// Copy into a host `String`, releasing the native allocation
    pub fn into_string(self) -> BindResult<String> {
        self.to_str().map(str::to_owned)
    }
}

impl Drop for NativeString<'_> {
    fn drop(&mut self) {
        // SAFETY: raw was allocated by this library and is freed exactly once
        unsafe { (self.library.symbols().bdk_string_free)(self.raw.as_ptr()) }
    }
}

impl std::fmt::Debug for NativeString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeString").field(&self.as_c_str()).finish()
    }
}

/// Take an owned native string, failing if it is null
///
/// # Safety
/// Same contract as [`NativeString::from_raw`].
pub(crate) unsafe fn take_string(
    raw: *mut c_char,
    library: &NativeLibrary,
    operation: &str,
) -> BindResult<String> {
    // SAFETY: per caller contract
    unsafe { NativeString::from_raw(raw, library) }
        .ok_or_else(|| BindError::null_pointer(operation))?
        .into_string()
}

/// Copy a string the native side still owns
///
/// # Safety
/// `raw` must be null or a live NUL terminated string.
pub(crate) unsafe fn copy_str(raw: *const c_char, field: &str) -> BindResult<String> {
    if raw.is_null() {
        return Err(BindError::null_pointer(field));
    }
    // SAFETY: non-null and NUL terminated per caller contract
    unsafe { CStr::from_ptr(raw) }
        .to_str()
        .map(str::to_owned)
        .map_err(|e| BindError::native("Utf8", format!("{field}: {e}")))
}

/// Lossy copy used for error messages, which must never fail to decode
///
/// # Safety
/// `raw` must be null or a live NUL terminated string.
pub(crate) unsafe fn copy_lossy(raw: *const c_char) -> String {
    if raw.is_null() {
        return String::new();
    }
    // SAFETY: non-null and NUL terminated per caller contract
    unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
}

/// NUL terminated copy of a host string argument
pub(crate) fn c_arg(value: &str, name: &str) -> BindResult<CString> {
    CString::new(value)
        .map_err(|e| BindError::invalid_input(format!("{name} contains a NUL byte at {}", e.nul_position())))
}
