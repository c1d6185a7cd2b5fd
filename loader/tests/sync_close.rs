mod common;

use common::{recording_fetch, value_for, FetchLog, TestError};
use fibre_loader::LoaderBuilder;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sync_close_flushes_pending_loads() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .max_batch(10)
    .wait(Duration::from_secs(5))
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  let start = Instant::now();
  let mut handles = vec![];
  for key in [1, 2] {
    let loader = loader.clone();
    handles.push(thread::spawn(move || {
      let value = loader.load(key).unwrap();
      assert_eq!(*value, value_for(key));
    }));
  }

  // Give both threads time to join the batch.
  thread::sleep(Duration::from_millis(100));
  loader.close();

  for handle in handles {
    handle.join().unwrap();
  }
  assert!(
    start.elapsed() < Duration::from_secs(2),
    "close should not wait for the wait window"
  );

  let mut keys = log.batches().concat();
  keys.sort();
  assert_eq!(keys, vec![1, 2]);
  assert_eq!(loader.metrics().batches_close, 1);
}

#[test]
fn test_sync_close_without_open_batch_is_a_no_op() {
  let log = FetchLog::new();
  let loader = LoaderBuilder::new()
    .fetch(recording_fetch(log.clone()))
    .build()
    .unwrap();

  loader.close();
  loader.close();
  assert_eq!(log.calls(), 0);
  assert_eq!(loader.metrics().batches_dispatched, 0);
}

#[test]
fn test_sync_dropped_loader_is_not_kept_alive_by_its_timer() {
  let token = Arc::new(());
  let loader = LoaderBuilder::new()
    .max_batch(2)
    .wait(Duration::from_secs(3))
    .fetch({
      let token = token.clone();
      move |keys: &[i32]| {
        let _held = &token;
        keys.iter().map(|key| Ok::<_, TestError>(value_for(*key))).collect()
      }
    })
    .build()
    .unwrap();

  // Fills the batch, so the timer started by its first key has nothing left
  // to do but is still sleeping.
  let results = loader.load_many(vec![1, 2]);
  assert!(results.iter().all(|r| r.is_ok()));
  assert_eq!(Arc::strong_count(&token), 2);

  drop(loader);
  thread::sleep(Duration::from_millis(200));
  assert_eq!(
    Arc::strong_count(&token),
    1,
    "dropping the last handle must release the fetch function"
  );
}
