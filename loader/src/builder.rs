use crate::config::LoaderConfig;
use crate::error::BuildError;
use crate::fetch::Fetcher;
use crate::handles::{AsyncLoader, Loader};
use crate::metrics::Metrics;
use crate::shared::{LoaderShared, LoaderState};
use crate::task::sweeper::{self, Sweeper};
use crate::TaskSpawner;

use core::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;

/// A builder for creating `Loader` and `AsyncLoader` instances.
///
/// Defaults match `LoaderConfig::default()`: batches of up to 100 keys, a
/// 10ms wait window, and a 1s result cache swept every 500ms.
pub struct LoaderBuilder<K, V, E> {
  pub(crate) max_batch: usize,
  pub(crate) wait: Duration,
  pub(crate) time_to_live: Duration,
  pub(crate) sweep_interval: Duration,
  fetcher: Option<Fetcher<K, V, E>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

// Manual Debug implementation for LoaderBuilder.
impl<K, V, E> fmt::Debug for LoaderBuilder<K, V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoaderBuilder")
      .field("max_batch", &self.max_batch)
      .field("wait", &self.wait)
      .field("time_to_live", &self.time_to_live)
      .field("sweep_interval", &self.sweep_interval)
      .field("fetcher", &self.fetcher)
      .field("has_spawner", &self.spawner.is_some())
      .finish()
  }
}

impl<K, V, E> Default for LoaderBuilder<K, V, E> {
  fn default() -> Self {
    Self::new()
  }
}

// --- General Configuration Methods ---
impl<K, V, E> LoaderBuilder<K, V, E> {
  /// Creates a new `LoaderBuilder` with default settings.
  pub fn new() -> Self {
    Self::from_config(&LoaderConfig::default())
  }

  /// Creates a builder from a `LoaderConfig`.
  pub fn from_config(config: &LoaderConfig) -> Self {
    Self {
      max_batch: config.max_batch,
      wait: config.wait,
      time_to_live: config.time_to_live,
      sweep_interval: config.sweep_interval,
      fetcher: None,
      spawner: None,
    }
  }

  /// Sets the maximum number of keys per batch. Appending the key that brings
  /// a batch to this size dispatches it immediately.
  pub fn max_batch(mut self, max_batch: usize) -> Self {
    self.max_batch = max_batch;
    self
  }

  /// Sets how long a batch stays open after its first key before it is
  /// dispatched regardless of size.
  pub fn wait(mut self, duration: Duration) -> Self {
    self.wait = duration;
    self
  }

  /// Sets how long a successful fetch result is served from the cache.
  /// Zero disables the cache.
  pub fn time_to_live(mut self, duration: Duration) -> Self {
    self.time_to_live = duration;
    self
  }

  /// Sets the interval of the background sweep that evicts expired results.
  /// Zero disables the cache.
  pub fn sweep_interval(mut self, duration: Duration) -> Self {
    self.sweep_interval = duration;
    self
  }

  /// Sets a synchronous fetch function.
  ///
  /// It receives every key of a batch in arrival order, duplicates included,
  /// and must return one result per key in the same order.
  pub fn fetch(mut self, f: impl Fn(&[K]) -> Vec<Result<V, E>> + Send + Sync + 'static) -> Self {
    self.fetcher = Some(Fetcher::Sync(Arc::new(f)));
    self
  }

  /// Sets an asynchronous fetch function. Only usable with `build_async()`.
  ///
  /// Same contract as `fetch`: one result per key, positionally aligned.
  pub fn async_fetch<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<Result<V, E>>> + Send + 'static,
  {
    self.fetcher = Some(Fetcher::Async(Arc::new(move |keys| f(keys).boxed())));
    self
  }

  /// Sets the spawner an `AsyncLoader` runs its dispatches and timers on.
  ///
  /// Without one, `build_async()` uses the current Tokio runtime.
  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }
}

// --- Build Methods ---
impl<K, V, E> LoaderBuilder<K, V, E>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Builds a blocking `Loader`. Requires a synchronous `fetch` function.
  pub fn build(mut self) -> Result<Loader<K, V, E>, BuildError> {
    self.validate()?;
    if matches!(self.fetcher, Some(Fetcher::Async(_))) {
      return Err(BuildError::SyncFetchRequired);
    }
    let shared = self.build_shared_core(None)?;
    Ok(Loader { shared })
  }

  /// Builds an `AsyncLoader`. Accepts either flavour of fetch function.
  pub fn build_async(mut self) -> Result<AsyncLoader<K, V, E>, BuildError> {
    self.validate()?;
    let spawner = match self.spawner.take() {
      Some(spawner) => spawner,
      None => Self::default_spawner()?,
    };
    let shared = self.build_shared_core(Some(&spawner))?;
    Ok(AsyncLoader { shared, spawner })
  }

  #[cfg(feature = "tokio")]
  fn default_spawner() -> Result<Arc<dyn TaskSpawner>, BuildError> {
    crate::runtime::TokioSpawner::try_current()
      .map(|spawner| Arc::new(spawner) as Arc<dyn TaskSpawner>)
      .ok_or(BuildError::SpawnerRequired)
  }

  #[cfg(not(feature = "tokio"))]
  fn default_spawner() -> Result<Arc<dyn TaskSpawner>, BuildError> {
    Err(BuildError::SpawnerRequired)
  }

  /// Central logic to construct the shared core of the loader.
  ///
  /// With a spawner the cache sweep runs as a task on it; without one it gets
  /// its own thread, stopped when the core is dropped.
  fn build_shared_core(
    &mut self,
    spawner: Option<&Arc<dyn TaskSpawner>>,
  ) -> Result<Arc<LoaderShared<K, V, E>>, BuildError> {
    let fetcher = self.fetcher.take().ok_or(BuildError::FetchRequired)?;
    let state = Arc::new(Mutex::new(LoaderState::new()));
    let metrics = Arc::new(Metrics::new());

    let caching = !self.time_to_live.is_zero() && !self.sweep_interval.is_zero();
    let sweeper = match (caching, spawner) {
      (false, _) => None,
      (true, Some(spawner)) => {
        sweeper::spawn_task(
          spawner,
          Arc::downgrade(&state),
          Arc::clone(&metrics),
          self.time_to_live,
          self.sweep_interval,
        );
        None
      }
      (true, None) => Some(Sweeper::spawn(
        Arc::clone(&state),
        Arc::clone(&metrics),
        self.time_to_live,
        self.sweep_interval,
      )),
    };

    Ok(Arc::new(LoaderShared {
      state,
      metrics,
      fetcher,
      max_batch: self.max_batch,
      wait: self.wait,
      time_to_live: caching.then_some(self.time_to_live),
      sweeper,
    }))
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.max_batch == 0 {
      return Err(BuildError::ZeroMaxBatch);
    }
    if self.fetcher.is_none() {
      return Err(BuildError::FetchRequired);
    }
    Ok(())
  }
}
