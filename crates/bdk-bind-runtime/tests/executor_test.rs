//! Integration tests for the Executor API

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use bdk_bind_core::{BindError, DatabaseConfig, Dispose, ElectrumConfig, ErrorKind, Network, TxBuilder, Wallet};
use bdk_bind_runtime::{Executor, ExecutorHandle, RuntimeError};
use bdk_bind_sys::StaticResolver;

const DESCRIPTOR: &str = "wpkh([c258d2e4/84h/1h/0h]tpubDDYkZojQFQjht8Tm4jsS3iuEmKjTiEGjG6KnuFNKKJb5A6ZUCUZKdvLdSDWofKi4ToRCwb9poe1XdqfUnP4jaJjCB2Zwv11ZLgSbnZSNecE/0/*)";

fn bind() {
    bdk_bind_sys::install(&StaticResolver::new(bdk_bind_native::exported_symbols())).unwrap();
}

#[tokio::test]
async fn test_run_returns_value() {
    let executor = Executor::builder().pool_size(2).build().unwrap();
    let handle = executor.handle();

    assert_eq!(handle.run(|| Ok(40 + 2)).await.unwrap(), 42);
    let snapshot = handle.stats();
    assert_eq!(snapshot.jobs_submitted, 1);
    assert_eq!(snapshot.jobs_completed, 1);

    executor.shutdown().await;
}

#[tokio::test]
async fn test_jobs_run_on_named_workers() {
    let executor = Executor::builder().pool_size(3).build().unwrap();
    let handle = executor.handle();

    let mut names = Vec::new();
    for _ in 0..12 {
        let name = handle
            .run(|| Ok(std::thread::current().name().map(str::to_owned)))
            .await
            .unwrap()
            .unwrap();
        names.push(name);
    }
    assert!(names.iter().all(|name| name.starts_with("bdk-worker-")));

    executor.shutdown().await;
}

#[tokio::test]
async fn test_bind_error_passes_through() {
    let executor = Executor::builder().pool_size(1).build().unwrap();
    let handle = executor.handle();

    let err = handle
        .run(|| Err::<(), _>(BindError::native("InsufficientFunds", "0 sat available")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ResourceExhausted));
    assert_eq!(executor.stats().snapshot().jobs_failed, 1);

    executor.shutdown().await;
}

#[tokio::test]
async fn test_worker_panic_is_reported() {
    let executor = Executor::builder().pool_size(1).build().unwrap();
    let handle = executor.handle();

    let err = handle.run(|| -> Result<(), BindError> { panic!("boom") }).await.unwrap_err();
    assert!(matches!(err, RuntimeError::WorkerPanicked(ref message) if message == "boom"));

    // The worker survives
    assert_eq!(handle.run(|| Ok("still here")).await.unwrap(), "still here");

    executor.shutdown().await;
}

#[tokio::test]
async fn test_timeout_cancels_the_wait_only() {
    let executor = Executor::builder().pool_size(1).build().unwrap();
    let handle = executor.handle();
    let (done_tx, done_rx) = mpsc::channel();

    let err = handle
        .run_with_timeout(
            move || {
                std::thread::sleep(Duration::from_millis(200));
                done_tx.send(()).ok();
                Ok(())
            },
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Timeout(20)));

    // The job still runs to completion
    tokio::task::spawn_blocking(move || done_rx.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .unwrap();
    executor.shutdown().await;

    let snapshot = handle.stats();
    assert_eq!(snapshot.jobs_completed, 1);
    assert_eq!(snapshot.jobs_cancelled, 1);
}

#[tokio::test]
async fn test_try_run_fails_fast_when_full() {
    let executor = Executor::builder().pool_size(1).queue_capacity(1).build().unwrap();
    let handle = executor.handle();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = handle
        .try_run(move || {
            started_tx.send(()).ok();
            release_rx.recv().ok();
            Ok(1)
        })
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let queued = handle.try_run(|| Ok(2)).unwrap();
    let err = handle.try_run(|| Ok(3)).err().unwrap();
    assert!(matches!(err, RuntimeError::QueueFull));

    release_tx.send(()).unwrap();
    assert_eq!(blocker.await.unwrap(), 1);
    assert_eq!(queued.await.unwrap(), 2);
    assert_eq!(handle.stats().jobs_submitted, 2);

    executor.shutdown().await;
}

/// Occupy the only worker and the only queue slot
fn saturate(
    handle: &ExecutorHandle,
) -> (
    impl std::future::Future<Output = Result<i32, RuntimeError>>,
    impl std::future::Future<Output = Result<i32, RuntimeError>>,
    mpsc::Sender<()>,
) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let blocker = handle
        .try_run(move || {
            started_tx.send(()).ok();
            release_rx.recv().ok();
            Ok(1)
        })
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let queued = handle.try_run(|| Ok(2)).unwrap();
    (blocker, queued, release_tx)
}

#[tokio::test]
async fn test_timeout_while_waiting_for_queue_space() {
    let executor = Executor::builder().pool_size(1).queue_capacity(1).build().unwrap();
    let handle = executor.handle();
    let (blocker, queued, release_tx) = saturate(&handle);

    let started = Instant::now();
    let err = handle
        .run_with_timeout(|| Ok(3), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Timeout(100)));
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());

    release_tx.send(()).unwrap();
    assert_eq!(blocker.await.unwrap(), 1);
    assert_eq!(queued.await.unwrap(), 2);
    // The timed out job never entered the queue
    assert_eq!(handle.stats().jobs_submitted, 2);

    executor.shutdown().await;
}

#[tokio::test]
async fn test_run_waits_for_queue_space_without_blocking() {
    let executor = Executor::builder().pool_size(1).queue_capacity(1).build().unwrap();
    let handle = executor.handle();
    let (blocker, queued, release_tx) = saturate(&handle);

    let waiting = tokio::spawn({
        let handle = handle.clone();
        async move { handle.run(|| Ok(3)).await }
    });

    // The runtime keeps running other work while `run` waits
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    release_tx.send(()).unwrap();
    assert_eq!(blocker.await.unwrap(), 1);
    assert_eq!(queued.await.unwrap(), 2);
    assert_eq!(waiting.await.unwrap().unwrap(), 3);
    assert_eq!(handle.stats().jobs_submitted, 3);

    executor.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_rejects_new_jobs() {
    let executor = Executor::builder().pool_size(2).build().unwrap();
    let handle = executor.handle();
    assert!(executor.is_running());
    assert_eq!(executor.pool_size(), 2);

    executor.shutdown().await;
    assert!(matches!(handle.run(|| Ok(())).await, Err(RuntimeError::ShutDown)));
    assert!(matches!(handle.try_run(|| Ok(())).err(), Some(RuntimeError::ShutDown)));
}

#[tokio::test]
async fn test_wallet_calls_off_thread() {
    bind();
    let executor = Executor::builder().pool_size(2).build().unwrap();
    let handle = executor.handle();

    let database = DatabaseConfig::memory().unwrap();
    let wallet = Arc::new(Wallet::new(DESCRIPTOR, None, Network::Regtest, &database).unwrap());

    let address = {
        let wallet = wallet.clone();
        handle.run(move || wallet.peek_address(0)).await.unwrap()
    };
    assert_eq!(address, "bcrt1qzg4mckdh50nwdm9hkzq06528rsu73hjxytqkxs");

    let builder = Arc::new(TxBuilder::new().unwrap());
    builder.add_recipient(&address, 20_000).unwrap();
    let err = handle.finish(builder.clone(), wallet.clone()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::ResourceExhausted));

    builder.dispose();
    wallet.dispose();
    database.dispose();
    executor.shutdown().await;
}

#[tokio::test]
async fn test_connect_failure_off_thread() {
    bind();
    let executor = Executor::builder().pool_size(1).build().unwrap();
    let handle = executor.handle();

    let config = ElectrumConfig::new("tcp://127.0.0.1:1").retry(0).timeout(2);
    let err = handle.connect(config).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NetworkFailure));

    executor.shutdown().await;
}
