//! Opaque handle: sole owner of one native resource
//!
//! A handle is `Live` until released, then `Released` forever. The slot is
//! guarded by a mutex, so a release waits for every in-flight call on the
//! same handle, and a call after release fails with `UseAfterFree` instead
//! of touching freed memory. The free function runs exactly once.
//!
//! The mutex is not reentrant: releasing a handle from inside its own
//! [`OpaqueHandle::with`] closure deadlocks.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use bdk_bind_sys::{NativeLibrary, OwnedResource, ResourceKind};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::error::{BindError, BindResult};
use crate::lifecycle::{self, HandleState, ReleaseCause};

pub struct OpaqueHandle<R: OwnedResource> {
    slot: Mutex<Option<NonNull<R>>>,
    library: Arc<NativeLibrary>,
}

// SAFETY: the native resources are internally synchronised and every access
// to the pointer goes through the slot mutex
unsafe impl<R: OwnedResource> Send for OpaqueHandle<R> {}
unsafe impl<R: OwnedResource> Sync for OpaqueHandle<R> {}

/// Live pointer, valid while the guard is held
pub struct Borrowed<'a, R> {
    _slot: MutexGuard<'a, Option<NonNull<R>>>,
    ptr: NonNull<R>,
}

impl<R> Borrowed<'_, R> {
    /// Get the raw pointer for the current native call
    pub fn as_ptr(&self) -> *mut R {
        self.ptr.as_ptr()
    }
}

impl<R: OwnedResource> OpaqueHandle<R> {
    /// Take ownership of a pointer returned by a native constructor
    ///
    /// A null pointer means the constructor broke its contract.
    pub fn wrap(ptr: *mut R, library: Arc<NativeLibrary>) -> BindResult<Self> {
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| BindError::null_pointer(format!("{} constructor", R::KIND)))?;
        lifecycle::stats().record_wrapped();
        trace!(kind = %R::KIND, "handle wrapped");
        Ok(Self {
            slot: Mutex::new(Some(ptr)),
            library,
        })
    }

    /// Get the resource kind
    pub fn kind(&self) -> ResourceKind {
        R::KIND
    }

    /// Get the library the handle belongs to
    pub fn library(&self) -> &Arc<NativeLibrary> {
        &self.library
    }

    /// Get the lifecycle state
    pub fn state(&self) -> HandleState {
        match *self.slot.lock() {
            Some(_) => HandleState::Live,
            None => HandleState::Released,
        }
    }

    /// Check if the handle is still live
    pub fn is_live(&self) -> bool {
        self.state() == HandleState::Live
    }

    /// Lock the handle for one native call
    pub fn borrow(&self) -> BindResult<Borrowed<'_, R>> {
        let slot = self.slot.lock();
        match *slot {
            Some(ptr) => Ok(Borrowed { _slot: slot, ptr }),
            None => Err(BindError::use_after_free(R::KIND)),
        }
    }

    /// Run `f` with the live pointer, holding the handle for its duration
    pub fn with<T>(
        &self,
        f: impl FnOnce(&Arc<NativeLibrary>, *mut R) -> BindResult<T>,
    ) -> BindResult<T> {
        let borrowed = self.borrow()?;
        f(&self.library, borrowed.as_ptr())
    }

    /// Free the native resource
    ///
    /// Returns `false` if it was already released.
    pub fn release(&self) -> bool {
        self.release_as(ReleaseCause::Explicit)
    }

    fn release_as(&self, cause: ReleaseCause) -> bool {
        let mut slot = self.slot.lock();
        let Some(ptr) = slot.take() else {
            return false;
        };
        // SAFETY: ptr came from this library's constructor for R and the
        // slot is now empty, so nothing can reach it again
        unsafe { (R::free_fn(self.library.symbols()))(ptr.as_ptr()) };
        lifecycle::stats().record_release(cause);
        debug!(kind = %R::KIND, ?cause, "handle released");
        true
    }
}

impl<R: OwnedResource> Drop for OpaqueHandle<R> {
    fn drop(&mut self) {
        if self.release_as(ReleaseCause::DropGuard) {
            warn!(kind = %R::KIND, "live handle released on drop; dispose it explicitly");
        }
    }
}

impl<R: OwnedResource> fmt::Debug for OpaqueHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueHandle")
            .field("kind", &R::KIND)
            .field("state", &self.state())
            .finish()
    }
}
