//! Native sequences
//!
//! An `FfiVec<T>` is one native block of `len` elements. Elements are copied
//! out, then the whole block (element strings included) is released with a
//! single call, including for empty sequences.

use bdk_bind_sys::{FfiVec, NativeLibrary, SequenceElement};

use crate::error::{BindError, BindResult};

/// Copy a sequence into a `Vec` and release the native block
///
/// A null `ptr` with `len == 0` is an empty sequence and nothing is freed.
/// A null `ptr` with `len > 0` is malformed and fails with `InvalidInput`.
///
/// # Safety
/// A non-null `ptr` must point to `len` initialised elements, unreleased,
/// that `release` frees.
pub unsafe fn to_sequence<T: Copy, U>(
    seq: FfiVec<T>,
    release: impl FnOnce(FfiVec<T>),
    mut element: impl FnMut(&T) -> BindResult<U>,
) -> BindResult<Vec<U>> {
    if seq.ptr.is_null() {
        if seq.len == 0 {
            return Ok(Vec::new());
        }
        return Err(BindError::invalid_input(format!(
            "null sequence claiming {} elements",
            seq.len
        )));
    }
    let _block = scopeguard::guard(seq, release);

    // SAFETY: non-null with len initialised elements per caller contract
    let elements = unsafe { std::slice::from_raw_parts(seq.ptr, seq.len) };
    elements.iter().map(&mut element).collect()
}

/// [`to_sequence`] with the free function registered for `T`
///
/// # Safety
/// `seq` must be an unreleased sequence returned by `library`.
pub(crate) unsafe fn unmarshal<T: SequenceElement, U>(
    library: &NativeLibrary,
    seq: FfiVec<T>,
    element: impl FnMut(&T) -> BindResult<U>,
) -> BindResult<Vec<U>> {
    let free = T::vec_free(library.symbols());
    // SAFETY: per caller contract; free releases blocks of T
    unsafe { to_sequence(seq, |seq| free(seq), element) }
}
