//! Worker threads and the jobs they run

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use bdk_bind_core::BindResult;
use crossbeam_channel::Receiver;
use tokio::sync::oneshot;
use tracing::{debug, info_span, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::executor::ExecutorStats;

/// A packaged closure that reports its own outcome
pub(crate) struct Task {
    run: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    pub(crate) fn new<T, F>(
        f: F,
        response: oneshot::Sender<RuntimeResult<T>>,
        stats: Arc<ExecutorStats>,
    ) -> Self
    where
        F: FnOnce() -> BindResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let run = move || {
            let outcome = match catch_unwind(AssertUnwindSafe(f)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                    Err(RuntimeError::Bind(e))
                }
                Err(payload) => {
                    stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                    let message = panic_message(payload.as_ref());
                    warn!(%message, "job panicked");
                    Err(RuntimeError::WorkerPanicked(message))
                }
            };
            stats.jobs_completed.fetch_add(1, Ordering::Relaxed);

            // The caller dropped its future; the result is discarded
            if response.send(outcome).is_err() {
                stats.jobs_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!("caller stopped waiting, result discarded");
            }
        };
        Self { run: Box::new(run) }
    }

    fn run(self) {
        (self.run)()
    }
}

pub(crate) enum Job {
    Run(Task),
    Shutdown,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run jobs until a shutdown message arrives or every sender is gone
pub(crate) fn run_worker(job_rx: Receiver<Job>) {
    let thread_name = std::thread::current()
        .name()
        .unwrap_or("bdk-worker")
        .to_string();

    let _span = info_span!("worker", name = %thread_name).entered();
    debug!("worker starting");

    while let Ok(job) = job_rx.recv() {
        match job {
            Job::Run(task) => task.run(),
            Job::Shutdown => {
                debug!("worker received shutdown");
                break;
            }
        }
    }

    debug!("worker stopped");
}
