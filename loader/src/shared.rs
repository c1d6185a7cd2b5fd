use crate::batch::{Batch, Ticket};
use crate::entry::CacheEntry;
use crate::error::{LoadError, LoadResult};
use crate::fetch::{DispatchTrigger, Fetcher};
use crate::metrics::Metrics;
use crate::runtime::TaskSpawner;
use crate::task::sweeper::Sweeper;

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

/// The batch currently accepting keys.
pub(crate) struct OpenBatch<K, V, E> {
  /// Keys in arrival order; a caller's index here is its index in the results.
  pub(crate) keys: Vec<K>,
  pub(crate) batch: Arc<Batch<V, E>>,
}

/// Everything guarded by the loader lock.
pub(crate) struct LoaderState<K, V, E> {
  pub(crate) current: Option<OpenBatch<K, V, E>>,
  pub(crate) cache: HashMap<K, CacheEntry<V>>,
}

impl<K, V, E> LoaderState<K, V, E> {
  pub(crate) fn new() -> Self {
    Self {
      current: None,
      cache: HashMap::new(),
    }
  }
}

/// The result of offering a key to the loader.
pub(crate) enum Enqueued<K, V, E> {
  /// A fresh cached value; no batch involved.
  Hit(Arc<V>),
  /// The key was appended to the open batch.
  Joined {
    ticket: Ticket<V, E>,
    /// This key opened a new batch, so the caller owns starting its timer.
    opened: bool,
    /// This key filled the batch, which is already detached and must be run.
    full: Option<Dispatch<K, V, E>>,
  },
}

/// A batch detached from the loader and owed a fetch.
///
/// If it is dropped before `complete` runs, every waiter of the batch receives
/// `LoadError::Abandoned` rather than waiting forever.
pub(crate) struct Dispatch<K, V, E> {
  pub(crate) keys: Vec<K>,
  pub(crate) trigger: DispatchTrigger,
  batch: Arc<Batch<V, E>>,
  metrics: Arc<Metrics>,
  completed: bool,
}

impl<K, V, E> Dispatch<K, V, E> {
  fn complete(mut self, results: Box<[LoadResult<V, E>]>) {
    self.completed = true;
    self.batch.complete(results);
  }
}

impl<K, V, E> Drop for Dispatch<K, V, E> {
  fn drop(&mut self) {
    if self.completed {
      return;
    }
    let count = self.keys.len();
    error!(keys = count, trigger = %self.trigger, "batch abandoned before its fetch completed");
    self
      .metrics
      .unresolved
      .fetch_add(count as u64, Ordering::Relaxed);
    let results: Vec<LoadResult<V, E>> = (0..count).map(|_| Err(LoadError::Abandoned)).collect();
    self.batch.complete(results.into_boxed_slice());
  }
}

/// The internal, thread-safe core of a loader, shared by its handles and
/// background tasks.
pub(crate) struct LoaderShared<K, V, E> {
  pub(crate) state: Arc<Mutex<LoaderState<K, V, E>>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) fetcher: Fetcher<K, V, E>,
  pub(crate) max_batch: usize,
  pub(crate) wait: Duration,
  /// `None` when caching is disabled.
  pub(crate) time_to_live: Option<Duration>,
  pub(crate) sweeper: Option<Sweeper>,
}

impl<K, V, E> fmt::Debug for LoaderShared<K, V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoaderShared")
      .field("max_batch", &self.max_batch)
      .field("wait", &self.wait)
      .field("time_to_live", &self.time_to_live)
      .field("fetcher", &self.fetcher)
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, E> Drop for LoaderShared<K, V, E> {
  fn drop(&mut self) {
    if let Some(sweeper) = self.sweeper.take() {
      sweeper.stop();
    }
  }
}

impl<K, V, E> LoaderShared<K, V, E>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Answers `key` from the cache, or appends it to the open batch, opening
  /// one if needed. Both happen under a single acquisition of the lock.
  pub(crate) fn enqueue(&self, key: K) -> Enqueued<K, V, E> {
    let mut state = self.state.lock();

    if let Some(ttl) = self.time_to_live {
      if let Some(entry) = state.cache.get(&key) {
        if entry.is_fresh(ttl, Instant::now()) {
          self.metrics.hits.fetch_add(1, Ordering::Relaxed);
          trace!("loader cache hit");
          return Enqueued::Hit(entry.value());
        }
      }
    }
    self.metrics.misses.fetch_add(1, Ordering::Relaxed);

    let opened = state.current.is_none();
    let open = state.current.get_or_insert_with(|| OpenBatch {
      keys: Vec::new(),
      batch: Arc::new(Batch::new()),
    });

    let index = open.keys.len();
    open.keys.push(key);
    let ticket = Ticket {
      batch: Arc::clone(&open.batch),
      index,
    };
    let is_full = open.keys.len() >= self.max_batch;

    let full = if is_full {
      self.detach_locked(&mut state, DispatchTrigger::Full)
    } else {
      None
    };

    Enqueued::Joined {
      ticket,
      opened,
      full,
    }
  }

  /// Detaches `batch` if it is still the open batch. A timer whose batch was
  /// already dispatched gets `None`.
  pub(crate) fn detach_if_open(&self, batch: &Arc<Batch<V, E>>) -> Option<Dispatch<K, V, E>> {
    let mut state = self.state.lock();
    if batch.is_dispatched() {
      return None;
    }
    match &state.current {
      Some(open) if Arc::ptr_eq(&open.batch, batch) => {}
      _ => return None,
    }
    self.detach_locked(&mut state, DispatchTrigger::Timer)
  }

  /// Detaches whatever batch is open, if any.
  pub(crate) fn detach_current(&self, trigger: DispatchTrigger) -> Option<Dispatch<K, V, E>> {
    let mut state = self.state.lock();
    self.detach_locked(&mut state, trigger)
  }

  fn detach_locked(
    &self,
    state: &mut LoaderState<K, V, E>,
    trigger: DispatchTrigger,
  ) -> Option<Dispatch<K, V, E>> {
    let open = state.current.take()?;
    open.batch.mark_dispatched();
    self.metrics.record_dispatch(trigger, open.keys.len());
    debug!(keys = open.keys.len(), %trigger, "dispatching batch");

    Some(Dispatch {
      keys: open.keys,
      trigger,
      batch: open.batch,
      metrics: Arc::clone(&self.metrics),
      completed: false,
    })
  }

  /// Runs the fetch on the current thread. Used by the blocking handle.
  pub(crate) fn run_blocking(&self, dispatch: Dispatch<K, V, E>) {
    match &self.fetcher {
      Fetcher::Sync(fetch) => {
        let results = fetch(&dispatch.keys);
        self.finish(dispatch, results);
      }
      Fetcher::Async(_) => {
        // The builder refuses this pairing; dropping abandons the batch.
        error!("a blocking dispatch cannot drive an async fetch function");
        drop(dispatch);
      }
    }
  }

  /// Whether the fetch function blocks the thread it runs on.
  pub(crate) fn fetches_blocking(&self) -> bool {
    matches!(self.fetcher, Fetcher::Sync(_))
  }

  /// Hands `dispatch` to the spawner: a synchronous fetch goes to its
  /// blocking pool, an asynchronous one becomes a task.
  pub(crate) fn spawn_run(
    this: &Arc<Self>,
    spawner: &Arc<dyn TaskSpawner>,
    dispatch: Dispatch<K, V, E>,
  ) {
    let shared = Arc::clone(this);
    if this.fetches_blocking() {
      spawner.spawn_blocking(Box::new(move || shared.run_blocking(dispatch)));
    } else {
      spawner.spawn(Box::pin(async move {
        shared.run(dispatch).await;
      }));
    }
  }

  /// Runs the fetch, awaiting it if it is asynchronous.
  pub(crate) async fn run(&self, dispatch: Dispatch<K, V, E>) {
    let results = match &self.fetcher {
      Fetcher::Sync(fetch) => fetch(&dispatch.keys),
      Fetcher::Async(fetch) => fetch(dispatch.keys.clone()).await,
    };
    self.finish(dispatch, results);
  }

  /// Zips the fetch results onto the batch's keys, caches the successes and
  /// releases every waiter.
  fn finish(&self, dispatch: Dispatch<K, V, E>, results: Vec<Result<V, E>>) {
    let expected = dispatch.keys.len();
    if results.len() != expected {
      warn!(
        expected,
        returned = results.len(),
        "fetch returned a result count that does not match its keys"
      );
    }

    let mut fetch_errors = 0u64;
    let mut missing = 0u64;
    let mut results = results.into_iter();
    let outcomes: Vec<LoadResult<V, E>> = (0..expected)
      .map(|index| match results.next() {
        Some(Ok(value)) => Ok(Arc::new(value)),
        Some(Err(err)) => {
          fetch_errors += 1;
          Err(LoadError::Fetch(Arc::new(err)))
        }
        None => {
          missing += 1;
          Err(LoadError::MissingResult { index })
        }
      })
      .collect();

    if self.time_to_live.is_some() {
      let mut state = self.state.lock();
      for (key, outcome) in dispatch.keys.iter().zip(&outcomes) {
        if let Ok(value) = outcome {
          state
            .cache
            .insert(key.clone(), CacheEntry::new(Arc::clone(value)));
        }
      }
    }

    self
      .metrics
      .fetch_errors
      .fetch_add(fetch_errors, Ordering::Relaxed);
    self.metrics.unresolved.fetch_add(missing, Ordering::Relaxed);

    dispatch.complete(outcomes.into_boxed_slice());
  }

  pub(crate) fn forget<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.state.lock().cache.remove(key).is_some()
  }

  pub(crate) fn clear_cache(&self) {
    self.state.lock().cache.clear();
  }
}
