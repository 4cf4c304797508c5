//! Explicit release and scoped use of native resources
//!
//! Every facade implements [`Dispose`]. Releasing is explicit; dropping a
//! live facade still frees the native side but is counted separately in
//! [`LifecycleStats`] so leaks of discipline show up in tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// State of one handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Live,
    Released,
}

/// How a handle was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReleaseCause {
    Explicit,
    DropGuard,
}

/// Process-wide handle counters
#[derive(Debug, Default)]
pub struct LifecycleStats {
    pub handles_wrapped: AtomicU64,
    pub released_explicitly: AtomicU64,
    pub released_by_drop: AtomicU64,
}

/// Point-in-time copy of [`LifecycleStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub handles_wrapped: u64,
    pub released_explicitly: u64,
    pub released_by_drop: u64,
}

impl LifecycleSnapshot {
    /// Handles wrapped but not yet released
    pub fn live(&self) -> u64 {
        self.handles_wrapped
            .saturating_sub(self.released_explicitly + self.released_by_drop)
    }
}

impl LifecycleStats {
    const fn new() -> Self {
        Self {
            handles_wrapped: AtomicU64::new(0),
            released_explicitly: AtomicU64::new(0),
            released_by_drop: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_wrapped(&self) {
        self.handles_wrapped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self, cause: ReleaseCause) {
        let counter = match cause {
            ReleaseCause::Explicit => &self.released_explicitly,
            ReleaseCause::DropGuard => &self.released_by_drop,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            handles_wrapped: self.handles_wrapped.load(Ordering::Relaxed),
            released_explicitly: self.released_explicitly.load(Ordering::Relaxed),
            released_by_drop: self.released_by_drop.load(Ordering::Relaxed),
        }
    }
}

static STATS: LifecycleStats = LifecycleStats::new();

/// Counters for every handle in the process
pub fn stats() -> &'static LifecycleStats {
    &STATS
}

/// A value owning native resources that can be released early
pub trait Dispose {
    /// Release the native resources now
    ///
    /// Idempotent: returns `false` if they were already released. Calls on
    /// a disposed value fail with `UseAfterFree`.
    fn dispose(&self) -> bool;

    fn is_live(&self) -> bool;
}

impl<T: Dispose + ?Sized> Dispose for &T {
    fn dispose(&self) -> bool {
        (**self).dispose()
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }
}

/// Run `body` with `resource`, disposing it afterwards even on panic
///
/// ```no_run
/// use bdk_bind_core::{DatabaseConfig, Dispose, using};
///
/// let created = using(DatabaseConfig::memory()?, |config| config.is_live());
/// # Ok::<(), bdk_bind_core::BindError>(())
/// ```
pub fn using<T: Dispose, R>(resource: T, body: impl FnOnce(&T) -> R) -> R {
    let resource = scopeguard::guard(resource, |resource| {
        resource.dispose();
    });
    body(&resource)
}
