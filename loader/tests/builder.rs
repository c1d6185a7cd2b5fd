mod common;

use common::{async_recording_fetch, recording_fetch, FetchLog, TestError};
use fibre_loader::{BuildError, LoaderBuilder, LoaderConfig, TaskSpawner};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_zero_max_batch_is_rejected() {
  let err = LoaderBuilder::new()
    .max_batch(0)
    .fetch(recording_fetch(FetchLog::new()))
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::ZeroMaxBatch);
}

#[test]
fn test_missing_fetch_is_rejected() {
  let err = LoaderBuilder::<i32, String, TestError>::new()
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::FetchRequired);
}

#[test]
fn test_blocking_loader_rejects_async_fetch() {
  let err = LoaderBuilder::new()
    .async_fetch(async_recording_fetch(FetchLog::new()))
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::SyncFetchRequired);
}

#[test]
fn test_async_loader_outside_runtime_needs_spawner() {
  let err = LoaderBuilder::new()
    .async_fetch(async_recording_fetch(FetchLog::new()))
    .build_async()
    .unwrap_err();
  assert_eq!(err, BuildError::SpawnerRequired);
}

#[test]
fn test_from_config_applies_settings() {
  let log = FetchLog::new();
  let config = LoaderConfig {
    max_batch: 1,
    wait: Duration::from_secs(10),
    time_to_live: Duration::ZERO,
    sweep_interval: Duration::from_millis(500),
  };
  let loader = LoaderBuilder::from_config(&config)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  // A batch of one dispatches immediately, and nothing is cached.
  loader.load(1).unwrap();
  loader.load(1).unwrap();
  assert_eq!(log.batches(), vec![vec![1], vec![1]]);
  assert_eq!(loader.metrics().batches_full, 2);
}

/// Runs everything on a tokio handle while counting spawned and finished
/// tasks.
struct CountingSpawner {
  handle: tokio::runtime::Handle,
  spawned: AtomicUsize,
  finished: Arc<AtomicUsize>,
}

impl CountingSpawner {
  fn new(handle: tokio::runtime::Handle) -> Arc<Self> {
    Arc::new(Self {
      handle,
      spawned: AtomicUsize::new(0),
      finished: Arc::new(AtomicUsize::new(0)),
    })
  }
}

impl TaskSpawner for CountingSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
    self.spawned.fetch_add(1, Ordering::SeqCst);
    let finished = self.finished.clone();
    self.handle.spawn(async move {
      future.await;
      finished.fetch_add(1, Ordering::SeqCst);
    });
  }

  fn delay(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move { tokio::time::sleep(duration).await })
  }
}

fn multi_thread_runtime() -> tokio::runtime::Runtime {
  tokio::runtime::Builder::new_multi_thread()
    .worker_threads(2)
    .enable_all()
    .build()
    .unwrap()
}

#[test]
fn test_custom_spawner_drives_async_loader() {
  let runtime = multi_thread_runtime();
  let spawner = CountingSpawner::new(runtime.handle().clone());

  // Built outside the runtime: only the custom spawner makes this possible.
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(10)
    .wait(Duration::from_millis(10))
    .async_fetch(async_recording_fetch(log.clone()))
    .spawner(spawner.clone())
    .build_async()
    .unwrap();
  // The cache sweep.
  assert_eq!(spawner.spawned.load(Ordering::SeqCst), 1);

  let value = runtime.block_on(async { loader.load(7).await.unwrap() });
  assert_eq!(*value, "value7");
  assert_eq!(log.calls(), 1);
  // Plus one timer task, which dispatched the batch itself.
  assert_eq!(spawner.spawned.load(Ordering::SeqCst), 2);
}

#[test]
fn test_async_sweep_runs_as_a_task_and_ends_with_the_loader() {
  let runtime = multi_thread_runtime();
  let spawner = CountingSpawner::new(runtime.handle().clone());

  let loader = LoaderBuilder::new()
    .time_to_live(Duration::from_millis(50))
    .sweep_interval(Duration::from_millis(20))
    .async_fetch(async_recording_fetch(FetchLog::new()))
    .spawner(spawner.clone())
    .build_async()
    .unwrap();
  assert_eq!(spawner.spawned.load(Ordering::SeqCst), 1);

  runtime.block_on(async {
    loader.load(1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
  });
  assert!(loader.metrics().evicted_by_ttl >= 1);

  drop(loader);
  runtime.block_on(async { tokio::time::sleep(Duration::from_millis(100)).await });
  assert_eq!(
    spawner.finished.load(Ordering::SeqCst),
    spawner.spawned.load(Ordering::SeqCst),
    "every task must end once the loader is dropped"
  );
}

#[test]
fn test_async_loader_without_cache_spawns_no_sweep() {
  let runtime = multi_thread_runtime();
  let spawner = CountingSpawner::new(runtime.handle().clone());

  let _loader = LoaderBuilder::new()
    .time_to_live(Duration::ZERO)
    .async_fetch(async_recording_fetch(FetchLog::new()))
    .spawner(spawner.clone())
    .build_async()
    .unwrap();
  assert_eq!(spawner.spawned.load(Ordering::SeqCst), 0);
}
