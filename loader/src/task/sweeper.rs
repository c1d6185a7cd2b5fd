use crate::metrics::Metrics;
use crate::runtime::TaskSpawner;
use crate::shared::LoaderState;

use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Shared between the sweeper thread and its owner. The flag is `true` once
/// the sweeper has been asked to stop.
type StopSignal = Arc<(Mutex<bool>, Condvar)>;

/// The background thread that periodically evicts expired entries from a
/// blocking loader's result cache. Async loaders sweep through `spawn_task`.
pub(crate) struct Sweeper {
  _handle: JoinHandle<()>, // The thread exits on its own once signalled.
  stop_signal: StopSignal,
}

impl Sweeper {
  /// Spawns a new sweeper thread.
  pub(crate) fn spawn<K, V, E>(
    state: Arc<Mutex<LoaderState<K, V, E>>>,
    metrics: Arc<Metrics>,
    time_to_live: Duration,
    interval: Duration,
  ) -> Self
  where
    K: Eq + Hash + Send + 'static,
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    let stop_signal: StopSignal = Arc::new((Mutex::new(false), Condvar::new()));
    let stop_clone = stop_signal.clone();

    let handle = thread::spawn(move || {
      let (stopped, condvar) = &*stop_clone;
      loop {
        {
          let mut stopped = stopped.lock();
          if !*stopped {
            // Sleeps for one interval, or until `stop` wakes us.
            let _ = condvar.wait_for(&mut stopped, interval);
          }
          if *stopped {
            break;
          }
        }
        sweep(&state, &metrics, time_to_live);
      }
    });

    Self {
      _handle: handle,
      stop_signal,
    }
  }

  /// Signals the sweeper thread to stop and wakes it.
  pub(crate) fn stop(self) {
    let (stopped, condvar) = &*self.stop_signal;
    *stopped.lock() = true;
    condvar.notify_all();
  }
}

/// Removes every entry older than `time_to_live`.
pub(crate) fn sweep<K, V, E>(
  state: &Mutex<LoaderState<K, V, E>>,
  metrics: &Metrics,
  time_to_live: Duration,
) where
  K: Eq + Hash,
{
  let now = Instant::now();
  let mut guard = state.lock();
  let before = guard.cache.len();
  guard
    .cache
    .retain(|_, entry| entry.is_fresh(time_to_live, now));
  let evicted = before - guard.cache.len();
  drop(guard);

  if evicted > 0 {
    metrics
      .evicted_by_ttl
      .fetch_add(evicted as u64, Ordering::Relaxed);
    debug!(evicted, "swept expired loader cache entries");
  }
}

/// Runs the sweep as a task on `spawner`, ticking through its `delay`.
///
/// The task holds the loader state weakly and ends at the first tick after
/// the loader is dropped.
pub(crate) fn spawn_task<K, V, E>(
  spawner: &Arc<dyn TaskSpawner>,
  state: Weak<Mutex<LoaderState<K, V, E>>>,
  metrics: Arc<Metrics>,
  time_to_live: Duration,
  interval: Duration,
) where
  K: Eq + Hash + Send + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  let ticker = Arc::clone(spawner);
  spawner.spawn(Box::pin(async move {
    loop {
      ticker.delay(interval).await;
      let Some(state) = state.upgrade() else {
        break;
      };
      sweep(&state, &metrics, time_to_live);
    }
  }));
}
