//! Worker pool for blocking native calls
//!
//! Native calls block (a chain sync can take minutes), so async callers hand
//! them to a pool of dedicated threads through an [`ExecutorHandle`] and await
//! the reply. Dropping the returned future stops the wait, not the call: the
//! native call runs to completion and its result is discarded.
//!
//! # Example
//!
//! ```no_run
//! use bdk_bind_core::{DatabaseConfig, Dispose, Network, Wallet};
//! use bdk_bind_runtime::Executor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = Executor::new().unwrap();
//!     let handle = executor.handle();
//!
//!     let balance = handle
//!         .run(|| {
//!             let database = DatabaseConfig::memory()?;
//!             let wallet = Wallet::new("wpkh(...)", None, Network::Regtest, &database)?;
//!             let balance = wallet.balance();
//!             wallet.dispose();
//!             database.dispose();
//!             balance
//!         })
//!         .await
//!         .unwrap();
//!     println!("{}", balance.total());
//!
//!     executor.shutdown().await;
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bdk_bind_core::{BindResult, Blockchain, ElectrumConfig, Psbt, TxBuilder, Wallet};
use crossbeam_channel::{Sender, TrySendError, bounded};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::worker::{Job, Task, run_worker};

/// First and longest pause while waiting for queue space
const ENQUEUE_BACKOFF_MIN: Duration = Duration::from_millis(1);
const ENQUEUE_BACKOFF_MAX: Duration = Duration::from_millis(50);

/// Statistics about executor operation
///
/// All counters are atomic and can be read at any time without locking.
#[derive(Debug, Default)]
pub struct ExecutorStats {
    /// Jobs accepted into the queue
    pub jobs_submitted: AtomicU64,
    /// Jobs that ran to completion, successfully or not
    pub jobs_completed: AtomicU64,
    /// Jobs that returned an error or panicked
    pub jobs_failed: AtomicU64,
    /// Jobs whose caller stopped waiting before the result arrived
    pub jobs_cancelled: AtomicU64,
}

impl ExecutorStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> ExecutorStatsSnapshot {
        ExecutorStatsSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
        }
    }

    /// Jobs queued or running
    pub fn jobs_in_flight(&self) -> u64 {
        let submitted = self.jobs_submitted.load(Ordering::Relaxed);
        let completed = self.jobs_completed.load(Ordering::Relaxed);
        submitted.saturating_sub(completed)
    }
}

/// A point-in-time snapshot of executor statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStatsSnapshot {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
}

/// Builder for an [`Executor`]
#[derive(Debug, Clone)]
pub struct ExecutorBuilder {
    pool_size: usize,
    queue_capacity: usize,
    thread_name: String,
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get().max(1),
            queue_capacity: 256,
            thread_name: "bdk-worker".to_string(),
        }
    }
}

impl ExecutorBuilder {
    /// Number of worker threads; defaults to the number of CPU cores
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    /// Jobs waiting beyond the running ones; defaults to 256
    ///
    /// When the queue is full, `try_run` fails with `QueueFull` and `run`
    /// waits for space without blocking the async runtime.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Worker thread name prefix; threads are named `{prefix}-{i}`
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Build and start the executor
    pub fn build(self) -> RuntimeResult<Executor> {
        Executor::new_with_config(self)
    }
}

/// Pool of threads running native calls
///
/// Use [`Executor::handle`] to submit jobs.
pub struct Executor {
    job_tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ExecutorStats>,
}

impl Executor {
    /// Create an executor with default settings
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    /// Create an executor builder
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    fn new_with_config(config: ExecutorBuilder) -> RuntimeResult<Self> {
        let (job_tx, job_rx) = bounded::<Job>(config.queue_capacity);
        let mut workers = Vec::with_capacity(config.pool_size);

        for i in 0..config.pool_size {
            let rx = job_rx.clone();
            let worker = std::thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, i))
                .spawn(move || run_worker(rx))?;
            workers.push(worker);
        }
        debug!(
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            "executor started"
        );

        Ok(Self {
            job_tx,
            workers,
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(ExecutorStats::new()),
        })
    }

    /// Thread-safe handle for submitting jobs
    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            job_tx: self.job_tx.clone(),
            shutdown: self.shutdown.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Get executor statistics
    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Check if the executor accepts jobs
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::SeqCst)
    }

    /// Get the number of worker threads
    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, let queued ones finish and join the workers
    pub async fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);

        for _ in &self.workers {
            let _ = self.job_tx.send(Job::Shutdown);
        }

        // Joining blocks; keep it off the async runtime
        let workers = self.workers;
        tokio::task::spawn_blocking(move || {
            for worker in workers {
                let _ = worker.join();
            }
        })
        .await
        .ok();
        debug!("executor shut down");
    }
}

/// Handle for submitting jobs to an [`Executor`]
///
/// `Clone + Send + Sync`; share it freely across tasks and threads.
#[derive(Clone)]
pub struct ExecutorHandle {
    job_tx: Sender<Job>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ExecutorStats>,
}

impl ExecutorHandle {
    fn package<T, F>(&self, f: F) -> RuntimeResult<(Job, oneshot::Receiver<RuntimeResult<T>>)>
    where
        F: FnOnce() -> BindResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(RuntimeError::ShutDown);
        }
        let (tx, rx) = oneshot::channel();
        Ok((Job::Run(Task::new(f, tx, self.stats.clone())), rx))
    }

    async fn reply<T>(rx: oneshot::Receiver<RuntimeResult<T>>) -> RuntimeResult<T> {
        rx.await.map_err(|_| RuntimeError::ShutDown)?
    }

    /// Queue `job`, sleeping between attempts while the queue is full
    ///
    /// Dropping the future before the job is queued discards the job.
    async fn enqueue(&self, mut job: Job) -> RuntimeResult<()> {
        let mut backoff = ENQUEUE_BACKOFF_MIN;
        loop {
            match self.job_tx.try_send(job) {
                Ok(()) => {
                    self.stats.jobs_submitted.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(TrySendError::Full(returned)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return Err(RuntimeError::ShutDown);
                    }
                    job = returned;
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(ENQUEUE_BACKOFF_MAX);
                }
                Err(TrySendError::Disconnected(_)) => return Err(RuntimeError::ShutDown),
            }
        }
    }

    /// Run `f` on a worker and await its result
    ///
    /// Waits for queue space when the queue is full; the wait yields to the
    /// async runtime, so it can be cancelled or timed out.
    pub async fn run<T, F>(&self, f: F) -> RuntimeResult<T>
    where
        F: FnOnce() -> BindResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (job, rx) = self.package(f)?;
        self.enqueue(job).await?;
        Self::reply(rx).await
    }

    /// [`ExecutorHandle::run`], giving up after `timeout`
    ///
    /// The timeout covers waiting for queue space as well as the call. On
    /// timeout a queued job keeps running and is counted as cancelled once it
    /// finishes; a job still waiting for space is never queued.
    pub async fn run_with_timeout<T, F>(&self, f: F, timeout: Duration) -> RuntimeResult<T>
    where
        F: FnOnce() -> BindResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::time::timeout(timeout, self.run(f))
            .await
            .map_err(|_| RuntimeError::Timeout(timeout.as_millis() as u64))?
    }

    /// Enqueue `f` now, failing fast with `QueueFull` under backpressure
    ///
    /// The job is queued before this returns; await the future for its result.
    pub fn try_run<T, F>(&self, f: F) -> RuntimeResult<impl Future<Output = RuntimeResult<T>> + use<T, F>>
    where
        F: FnOnce() -> BindResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let (job, rx) = self.package(f)?;
        self.job_tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => RuntimeError::QueueFull,
            TrySendError::Disconnected(_) => RuntimeError::ShutDown,
        })?;
        self.stats.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        Ok(Self::reply(rx))
    }

    /// Connect to an Electrum server off-thread
    pub async fn connect(&self, config: ElectrumConfig) -> RuntimeResult<Blockchain> {
        self.run(move || Blockchain::connect(&config)).await
    }

    /// Sync `wallet` against `blockchain` off-thread
    pub async fn sync(&self, wallet: Arc<Wallet>, blockchain: Arc<Blockchain>) -> RuntimeResult<()> {
        self.run(move || wallet.sync(&blockchain)).await
    }

    /// Build a PSBT off-thread
    pub async fn finish(&self, builder: Arc<TxBuilder>, wallet: Arc<Wallet>) -> RuntimeResult<Psbt> {
        self.run(move || builder.finish(&wallet)).await
    }

    /// Get snapshot of executor statistics
    pub fn stats(&self) -> ExecutorStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        fn assert_clone<T: Clone>() {}

        assert_send::<ExecutorHandle>();
        assert_sync::<ExecutorHandle>();
        assert_clone::<ExecutorHandle>();
    }

    #[test]
    fn test_builder_clamps_to_one() {
        let builder = Executor::builder().pool_size(0).queue_capacity(0);
        assert_eq!(builder.pool_size, 1);
        assert_eq!(builder.queue_capacity, 1);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ExecutorBuilder::default();
        assert_eq!(builder.queue_capacity, 256);
        assert_eq!(builder.thread_name, "bdk-worker");
        assert!(builder.pool_size >= 1);
    }

    #[test]
    fn test_jobs_in_flight() {
        let stats = ExecutorStats::new();
        stats.jobs_submitted.store(5, Ordering::Relaxed);
        stats.jobs_completed.store(3, Ordering::Relaxed);
        assert_eq!(stats.jobs_in_flight(), 2);
    }
}
