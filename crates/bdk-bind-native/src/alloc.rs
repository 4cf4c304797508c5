//! Counted allocations handed across the boundary
//!
//! Every box, string and vector block given to the caller increments
//! [`LIVE`]; every matching free decrements it.

use std::ffi::{CString, c_char};
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::abi::FfiVec;

static LIVE: AtomicI64 = AtomicI64::new(0);

pub fn live() -> u64 {
    LIVE.load(Ordering::SeqCst).max(0) as u64
}

fn acquire() {
    LIVE.fetch_add(1, Ordering::SeqCst);
}

fn release() {
    LIVE.fetch_sub(1, Ordering::SeqCst);
}

/// Box `value` for the caller
pub fn boxed<T>(value: T) -> *mut T {
    acquire();
    Box::into_raw(Box::new(value))
}

/// Reclaim a pointer produced by [`boxed`]
///
/// # Safety
/// `ptr` must be null or come from `boxed::<T>` and not been reclaimed yet.
pub unsafe fn unbox<T>(ptr: *mut T) -> Option<Box<T>> {
    if ptr.is_null() {
        return None;
    }
    release();
    // SAFETY: per caller contract
    Some(unsafe { Box::from_raw(ptr) })
}

/// Copy `value` into a caller-owned C string
///
/// Interior NUL bytes become U+FFFD so the rest of the text survives.
pub fn c_string(value: impl Into<Vec<u8>>) -> *mut c_char {
    let value = value.into();
    let mut bytes = Vec::with_capacity(value.len() + 1);
    for byte in value {
        if byte == 0 {
            bytes.extend_from_slice("\u{FFFD}".as_bytes());
        } else {
            bytes.push(byte);
        }
    }
    // SAFETY: every NUL byte was replaced above
    let value = unsafe { CString::from_vec_unchecked(bytes) };
    acquire();
    value.into_raw()
}

/// # Safety
/// `ptr` must be null or come from [`c_string`] and not been freed yet.
pub unsafe fn free_c_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    release();
    // SAFETY: per caller contract
    drop(unsafe { CString::from_raw(ptr) });
}

/// Hand a vector to the caller, keeping its capacity for the matching free
pub fn vec_into_raw<T>(value: Vec<T>) -> FfiVec<T> {
    let mut value = ManuallyDrop::new(value);
    acquire();
    FfiVec {
        ptr: value.as_mut_ptr(),
        len: value.len(),
        cap: value.capacity(),
    }
}

/// # Safety
/// `vec` must be a block produced by [`vec_into_raw`] and not been freed yet,
/// or carry a null pointer.
pub unsafe fn vec_from_raw<T>(vec: FfiVec<T>) -> Option<Vec<T>> {
    if vec.ptr.is_null() {
        return None;
    }
    release();
    // SAFETY: per caller contract the parts come from a leaked Vec<T>
    Some(unsafe { Vec::from_raw_parts(vec.ptr, vec.len, vec.cap) })
}
