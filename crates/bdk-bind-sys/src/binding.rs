//! Process-wide binding
//!
//! The first successful or failed bind is cached and returned to every later
//! caller. A cached `LinkageError` is never retried; only [`teardown`]
//! clears the slot, which exists for test isolation.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::error::LinkageError;
use crate::library::{LibraryConfig, NativeLibrary};
use crate::symbols::SymbolResolver;

type Slot = Option<Result<Arc<NativeLibrary>, LinkageError>>;

static BINDING: RwLock<Slot> = parking_lot::const_rwlock(None);

fn get_or_bind(
    bind: impl FnOnce() -> Result<NativeLibrary, LinkageError>,
) -> Result<Arc<NativeLibrary>, LinkageError> {
    if let Some(cached) = BINDING.read().as_ref() {
        return cached.clone();
    }

    let mut slot = BINDING.write();
    if let Some(cached) = slot.as_ref() {
        return cached.clone();
    }

    let bound = bind().map(Arc::new);
    match &bound {
        Ok(library) => debug!(origin = library.origin(), "native library bound"),
        Err(e) => error!(error = %e, "native library unavailable"),
    }
    *slot = Some(bound.clone());
    bound
}

/// The process-wide library, loaded on first use with [`LibraryConfig::default`]
pub fn global() -> Result<Arc<NativeLibrary>, LinkageError> {
    get_or_bind(|| NativeLibrary::open(&LibraryConfig::default()))
}

/// Bind with an explicit configuration
///
/// Has no effect if a binding is already cached; the cached one is returned.
pub fn bind(config: &LibraryConfig) -> Result<Arc<NativeLibrary>, LinkageError> {
    get_or_bind(|| NativeLibrary::open(config))
}

/// Bind symbols already linked into the process
///
/// Has no effect if a binding is already cached; the cached one is returned.
pub fn install(resolver: &dyn SymbolResolver) -> Result<Arc<NativeLibrary>, LinkageError> {
    get_or_bind(|| NativeLibrary::from_resolver(resolver, &LibraryConfig::default()))
}

/// Drop the cached binding
///
/// Handles created earlier keep their own reference to the library, so its
/// code stays mapped until they are released. Returns whether a binding was
/// cached.
pub fn teardown() -> bool {
    let previous = BINDING.write().take();
    if previous.is_some() {
        debug!("native binding torn down");
    }
    previous.is_some()
}

/// Whether a binding (successful or failed) is cached
pub fn is_bound() -> bool {
    BINDING.read().is_some()
}
