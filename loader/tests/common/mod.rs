#![allow(dead_code)]

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// The error type used by test fetch functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub String);

impl fmt::Display for TestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::error::Error for TestError {}

pub fn value_for(key: i32) -> String {
  format!("value{}", key)
}

/// Records every batch a fetch function is called with.
#[derive(Default)]
pub struct FetchLog {
  batches: Mutex<Vec<Vec<i32>>>,
}

impl FetchLog {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn record(&self, keys: &[i32]) {
    self.batches.lock().unwrap().push(keys.to_vec());
  }

  pub fn calls(&self) -> usize {
    self.batches.lock().unwrap().len()
  }

  pub fn batches(&self) -> Vec<Vec<i32>> {
    self.batches.lock().unwrap().clone()
  }
}

/// A synchronous fetch that succeeds for every key with `value_for(key)`.
pub fn recording_fetch(log: Arc<FetchLog>) -> impl Fn(&[i32]) -> Vec<Result<String, TestError>> {
  move |keys: &[i32]| {
    log.record(keys);
    keys.iter().map(|key| Ok(value_for(*key))).collect()
  }
}

/// A synchronous fetch that fails every key with "fetch error".
pub fn failing_fetch(log: Arc<FetchLog>) -> impl Fn(&[i32]) -> Vec<Result<String, TestError>> {
  move |keys: &[i32]| {
    log.record(keys);
    keys
      .iter()
      .map(|_| Err(TestError("fetch error".to_string())))
      .collect()
  }
}

pub type FetchFuture = Pin<Box<dyn Future<Output = Vec<Result<String, TestError>>> + Send>>;

/// An async fetch that succeeds for every key with `value_for(key)`.
pub fn async_recording_fetch(
  log: Arc<FetchLog>,
) -> impl Fn(Vec<i32>) -> FetchFuture + Send + Sync + 'static {
  move |keys: Vec<i32>| {
    let log = log.clone();
    Box::pin(async move {
      log.record(&keys);
      keys.iter().map(|key| Ok(value_for(*key))).collect()
    })
  }
}

/// An async fetch that fails every key with "fetch error".
pub fn async_failing_fetch(
  log: Arc<FetchLog>,
) -> impl Fn(Vec<i32>) -> FetchFuture + Send + Sync + 'static {
  move |keys: Vec<i32>| {
    let log = log.clone();
    Box::pin(async move {
      log.record(&keys);
      keys
        .iter()
        .map(|_| Err(TestError("fetch error".to_string())))
        .collect()
    })
  }
}
