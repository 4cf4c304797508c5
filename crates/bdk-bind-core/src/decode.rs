//! Tagged result decoding
//!
//! Every fallible native call returns an owned `FfiResult<T>`: a payload slot
//! and an error slot, exactly one of them set. The decoder reads the tag,
//! turns the error side into a [`BindError`] or hands the payload to a
//! conversion, then releases the transit struct on every path. The payload
//! itself is never freed here; the conversion takes ownership of it.

use bdk_bind_sys::{FfiError, FfiResult, NativeLibrary, TransitPayload};
use tracing::trace;

use crate::error::{BindError, BindResult};
use crate::string::copy_lossy;

/// Decode a result using the transit free function registered for `T`
pub(crate) fn decode<T, U>(
    library: &NativeLibrary,
    operation: &str,
    raw: *mut FfiResult<T>,
    payload: impl FnOnce(T) -> BindResult<U>,
) -> BindResult<U>
where
    T: TransitPayload,
{
    // SAFETY: raw was returned by a native call whose transit struct is
    // released by T's registered free function
    unsafe { decode_with(raw, T::transit_free(library.symbols()), operation, payload) }
}

/// Decode a result with an explicit transit free function
///
/// A null `raw` fails with [`BindError::NullPointer`] and frees nothing.
///
/// # Safety
/// `raw` must be null or an unreleased transit struct that `free` releases.
pub unsafe fn decode_with<T: Copy, U>(
    raw: *mut FfiResult<T>,
    free: unsafe extern "C" fn(*mut FfiResult<T>),
    operation: &str,
    payload: impl FnOnce(T) -> BindResult<U>,
) -> BindResult<U> {
    if raw.is_null() {
        return Err(BindError::null_pointer(operation));
    }
    // SAFETY: released exactly once, when the guard goes out of scope
    let transit = scopeguard::guard(raw, |raw| unsafe { free(raw) });

    // SAFETY: non-null and owned until the guard runs
    let (ok, err) = unsafe { ((**transit).ok, (**transit).err) };
    if !err.is_null() {
        // SAFETY: a set error slot points to a live FfiError
        let error = unsafe { read_error(err) };
        trace!(operation, error = %error, "native call failed");
        return Err(error);
    }
    payload(ok)
}

/// # Safety
/// `err` must point to a live `FfiError`.
unsafe fn read_error(err: *const FfiError) -> BindError {
    // SAFETY: per caller contract; both strings are owned by the error
    let (code, message) = unsafe { (copy_lossy((*err).code), copy_lossy((*err).message)) };
    BindError::native(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Transit structs built on the host side; the free functions count and
    // release them
    fn ok_result(value: u64) -> *mut FfiResult<u64> {
        Box::into_raw(Box::new(FfiResult {
            ok: value,
            err: std::ptr::null_mut(),
        }))
    }

    fn err_result(code: &str, message: &str) -> *mut FfiResult<u64> {
        let error = Box::into_raw(Box::new(FfiError {
            code: CString::new(code).unwrap().into_raw(),
            message: CString::new(message).unwrap().into_raw(),
        }));
        Box::into_raw(Box::new(FfiResult { ok: 0, err: error }))
    }

    macro_rules! counting_free {
        ($name:ident, $counter:ident) => {
            static $counter: AtomicUsize = AtomicUsize::new(0);

            unsafe extern "C" fn $name(raw: *mut FfiResult<u64>) {
                $counter.fetch_add(1, Ordering::SeqCst);
                let result = unsafe { Box::from_raw(raw) };
                if !result.err.is_null() {
                    let error = unsafe { Box::from_raw(result.err) };
                    unsafe {
                        drop(CString::from_raw(error.code));
                        drop(CString::from_raw(error.message));
                    }
                }
            }
        };
    }

    counting_free!(free_success, SUCCESS_FREES);
    counting_free!(free_failure, FAILURE_FREES);
    counting_free!(free_panicking, PANICKING_FREES);
    counting_free!(free_never, NEVER_FREES);

    #[test]
    fn test_success_frees_transit_once() {
        let decoded = unsafe { decode_with(ok_result(42), free_success, "answer", |v| Ok(v + 1)) };
        assert_eq!(decoded.unwrap(), 43);
        assert_eq!(SUCCESS_FREES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_keeps_code_and_message() {
        let raw = err_result("InsufficientFunds", "Insufficient funds: 0 sat available of 1000 sat needed");
        let decoded = unsafe { decode_with(raw, free_failure, "finish", |_| -> BindResult<()> { unreachable!() }) };

        let err = decoded.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(err.code(), Some("InsufficientFunds"));
        assert!(err.to_string().contains("0 sat available of 1000 sat needed"));
        assert_eq!(FAILURE_FREES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_conversion_panic_still_frees() {
        let outcome = std::panic::catch_unwind(|| unsafe {
            decode_with(ok_result(7), free_panicking, "explode", |_| -> BindResult<()> {
                panic!("conversion failed")
            })
        });
        assert!(outcome.is_err());
        assert_eq!(PANICKING_FREES.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_null_result_is_internal_error() {
        let decoded = unsafe { decode_with(std::ptr::null_mut(), free_never, "bdk_wallet_balance", Ok) };
        let err = decoded.unwrap_err();
        assert!(matches!(err, BindError::NullPointer { ref operation } if operation == "bdk_wallet_balance"));
        assert_eq!(NEVER_FREES.load(Ordering::SeqCst), 0);
    }
}
