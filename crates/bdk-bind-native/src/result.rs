//! Building and freeing tagged results

use std::ffi::{CStr, c_char};
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error};

use crate::abi::{Blank, FfiError, FfiResult};
use crate::alloc::{boxed, c_string, free_c_string, unbox};

/// Failure reported to the caller as `FfiError { code, message }`
#[derive(Debug)]
pub struct NativeError {
    pub code: &'static str,
    pub message: String,
}

impl NativeError {
    /// Create an error with a taxonomy code
    pub fn new(code: &'static str, message: impl Display) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

pub type NativeResult<T> = Result<T, NativeError>;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run an entry point body and box its outcome into a transit result owned
/// by the caller
///
/// A panic must not unwind across `extern "C"`; it is reported as a `Panic`
/// error instead.
pub fn respond<T: Blank>(body: impl FnOnce() -> NativeResult<T>) -> *mut FfiResult<T> {
    let outcome = catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(%message, "native call panicked");
        Err(NativeError::new("Panic", message))
    });
    match outcome {
        Ok(ok) => boxed(FfiResult {
            ok,
            err: std::ptr::null_mut(),
        }),
        Err(error) => {
            debug!(code = error.code, message = %error.message, "native call failed");
            let err = boxed(FfiError {
                code: c_string(error.code),
                message: c_string(error.message),
            });
            boxed(FfiResult { ok: T::blank(), err })
        }
    }
}

/// Free a transit result and its error, leaving the payload alone
///
/// # Safety
/// `result` must be null or come from [`respond`] and not been freed yet.
pub unsafe fn free_result<T>(result: *mut FfiResult<T>) {
    // SAFETY: per caller contract
    let Some(result) = (unsafe { unbox(result) }) else {
        return;
    };
    // SAFETY: err is null or was boxed by respond together with its strings
    if let Some(error) = unsafe { unbox(result.err) } {
        unsafe {
            free_c_string(error.code);
            free_c_string(error.message);
        }
    }
}

/// Borrow a required string argument
///
/// # Safety
/// `ptr` must be null or point to a NUL terminated string valid for `'a`.
pub unsafe fn arg_str<'a>(ptr: *const c_char, name: &str) -> NativeResult<&'a str> {
    if ptr.is_null() {
        return Err(NativeError::new("NullArgument", format!("{name} is null")));
    }
    // SAFETY: per caller contract
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| NativeError::new("Utf8", format!("{name}: {e}")))
}

/// Borrow an optional string argument, null meaning absent
///
/// # Safety
/// Same as [`arg_str`].
pub unsafe fn opt_arg_str<'a>(ptr: *const c_char, name: &str) -> NativeResult<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: per caller contract
    unsafe { arg_str(ptr, name) }.map(Some)
}

/// Borrow a handle argument
///
/// # Safety
/// `ptr` must be null or point to a live `T` valid for `'a`.
pub unsafe fn arg_ref<'a, T>(ptr: *mut T, name: &str) -> NativeResult<&'a T> {
    // SAFETY: per caller contract
    unsafe { ptr.as_ref() }.ok_or_else(|| NativeError::new("NullArgument", format!("{name} is null")))
}
