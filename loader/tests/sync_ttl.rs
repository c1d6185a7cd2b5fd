mod common;

use common::{recording_fetch, FetchLog};
use fibre_loader::LoaderBuilder;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TINY_TTL: Duration = Duration::from_millis(50);
const SWEEP_TICK: Duration = Duration::from_millis(20);
const SLEEP_MARGIN: Duration = Duration::from_millis(100);

#[test]
fn test_sync_cached_result_expires_after_ttl() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(3)
    .wait(Duration::from_millis(5))
    .time_to_live(TINY_TTL)
    .sweep_interval(SWEEP_TICK)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let first = loader.load(1).unwrap();
  assert_eq!(log.calls(), 1);

  // Wait for longer than the TTL plus a sweep tick.
  thread::sleep(TINY_TTL + SWEEP_TICK + SLEEP_MARGIN);

  let second = loader.load(1).unwrap();
  assert_eq!(*second, "value1");
  assert_eq!(log.calls(), 2, "an expired entry must be fetched again");
  assert!(!Arc::ptr_eq(&first, &second));
  assert!(loader.metrics().evicted_by_ttl >= 1);
}

#[test]
fn test_sync_zero_ttl_disables_cache() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(1)
    .time_to_live(Duration::ZERO)
    .sweep_interval(SWEEP_TICK)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  loader.load(1).unwrap();
  loader.load(1).unwrap();
  assert_eq!(log.calls(), 2);
  assert_eq!(loader.metrics().hits, 0);
}

#[test]
fn test_sync_zero_sweep_interval_disables_cache() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(1)
    .time_to_live(Duration::from_secs(60))
    .sweep_interval(Duration::ZERO)
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  loader.load(1).unwrap();
  loader.load(1).unwrap();
  assert_eq!(log.calls(), 2);
}
