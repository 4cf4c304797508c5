//! Async executor for the bdk bindings
//!
//! Every native call blocks its thread. This crate runs them on a pool of
//! named worker threads (`bdk-worker-{i}`) behind a bounded queue and hands
//! the results back to async callers.

mod error;
mod executor;
mod worker;

pub use error::{RuntimeError, RuntimeResult};
pub use executor::{Executor, ExecutorBuilder, ExecutorHandle, ExecutorStats, ExecutorStatsSnapshot};
