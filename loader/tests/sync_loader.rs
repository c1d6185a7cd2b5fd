mod common;

use common::{recording_fetch, value_for, FetchLog};
use fibre_loader::LoaderBuilder;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sync_single_load() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(3)
    .wait(Duration::from_millis(10))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let value = loader.load(1).unwrap();
  assert_eq!(*value, "value1");
  assert_eq!(log.batches(), vec![vec![1]]);

  let metrics = loader.metrics();
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.batches_timer, 1);
  assert_eq!(metrics.keys_fetched, 1);
}

#[test]
fn test_sync_concurrent_loads_share_one_batch() {
  let log = FetchLog::new();
  let num_threads = 3;
  let loader = LoaderBuilder::new()
    .max_batch(num_threads)
    // Long enough that only the size trigger can explain a fast dispatch.
    .wait(Duration::from_secs(2))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let barrier = Arc::new(Barrier::new(num_threads));
  let start = Instant::now();
  let mut handles = vec![];

  for key in 1..=num_threads as i32 {
    let loader = loader.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      let value = loader.load(key).unwrap();
      assert_eq!(*value, value_for(key));
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  assert!(
    start.elapsed() < Duration::from_secs(1),
    "a full batch should dispatch without waiting out the wait window"
  );
  let batches = log.batches();
  assert_eq!(batches.len(), 1, "fetch should be called exactly once");
  let mut keys = batches[0].clone();
  keys.sort();
  assert_eq!(keys, vec![1, 2, 3]);
  assert_eq!(loader.metrics().batches_full, 1);
}

#[test]
fn test_sync_cache_hit_skips_fetch() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(3)
    .wait(Duration::from_millis(10))
    .time_to_live(Duration::from_secs(60))
    .sweep_interval(Duration::from_secs(60))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let first = loader.load(1).unwrap();
  let second = loader.load(1).unwrap();

  assert_eq!(log.calls(), 1, "second load should be served from the cache");
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(loader.metrics().hits, 1);
  assert_eq!(loader.metrics().misses, 1);
}

#[test]
fn test_sync_load_many_keeps_input_order_and_duplicates() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(4)
    .wait(Duration::from_secs(2))
    .time_to_live(Duration::ZERO)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let results = loader.load_many(vec![3, 1, 3, 2]);
  let values: Vec<String> = results.into_iter().map(|r| (*r.unwrap()).clone()).collect();

  assert_eq!(values, vec!["value3", "value1", "value3", "value2"]);
  assert_eq!(log.batches(), vec![vec![3, 1, 3, 2]]);
}

#[test]
fn test_sync_load_many_splits_at_max_batch() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(2)
    .wait(Duration::from_millis(10))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let results = loader.load_many(1..=5);
  assert!(results.iter().all(|r| r.is_ok()));
  assert_eq!(log.batches(), vec![vec![1, 2], vec![3, 4], vec![5]]);

  let metrics = loader.metrics();
  assert_eq!(metrics.batches_full, 2);
  assert_eq!(metrics.batches_timer, 1);
}

#[test]
fn test_sync_loads_after_dispatch_start_a_new_batch() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(1)
    .time_to_live(Duration::ZERO)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  assert_eq!(*loader.load(7).unwrap(), "value7");
  assert_eq!(*loader.load(7).unwrap(), "value7");
  assert_eq!(log.batches(), vec![vec![7], vec![7]]);
}

#[test]
fn test_sync_forget_forces_refetch() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(1)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  loader.load(1).unwrap();
  assert!(loader.forget(&1));
  assert!(!loader.forget(&1));
  loader.load(1).unwrap();
  assert_eq!(log.calls(), 2);

  loader.clear_cache();
  loader.load(1).unwrap();
  assert_eq!(log.calls(), 3);
}

#[test]
fn test_sync_many_callers_across_batches_get_their_own_values() {
  let log = FetchLog::new();
  let num_threads = 64;
  let max_batch = 8;
  let loader = LoaderBuilder::new()
    .max_batch(max_batch)
    .wait(Duration::from_millis(50))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let barrier = Arc::new(Barrier::new(num_threads));
  let mut handles = vec![];
  for key in 0..num_threads as i32 {
    let loader = loader.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      let value = loader.load(key).unwrap();
      assert_eq!(*value, value_for(key), "caller got another key's value");
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }

  let batches = log.batches();
  assert!(batches.len() >= num_threads / max_batch);
  assert!(batches.iter().all(|batch| batch.len() <= max_batch));
  let mut keys = batches.concat();
  keys.sort();
  assert_eq!(keys, (0..num_threads as i32).collect::<Vec<_>>());
}
