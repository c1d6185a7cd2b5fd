use crate::fetch::DispatchTrigger;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for a loader.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Cache ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) evicted_by_ttl: CachePadded<AtomicU64>,

  // --- Dispatch ---
  pub(crate) batches_full: CachePadded<AtomicU64>,
  pub(crate) batches_timer: CachePadded<AtomicU64>,
  pub(crate) batches_close: CachePadded<AtomicU64>,
  pub(crate) keys_fetched: CachePadded<AtomicU64>,

  // --- Failures ---
  pub(crate) fetch_errors: CachePadded<AtomicU64>,
  pub(crate) unresolved: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      evicted_by_ttl: CachePadded::new(AtomicU64::new(0)),
      batches_full: CachePadded::new(AtomicU64::new(0)),
      batches_timer: CachePadded::new(AtomicU64::new(0)),
      batches_close: CachePadded::new(AtomicU64::new(0)),
      keys_fetched: CachePadded::new(AtomicU64::new(0)),
      fetch_errors: CachePadded::new(AtomicU64::new(0)),
      unresolved: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_dispatch(&self, trigger: DispatchTrigger, keys: usize) {
    let counter = match trigger {
      DispatchTrigger::Full => &self.batches_full,
      DispatchTrigger::Timer => &self.batches_timer,
      DispatchTrigger::Close => &self.batches_close,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    self.keys_fetched.fetch_add(keys as u64, Ordering::Relaxed);
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;
    let batches_full = self.batches_full.load(Ordering::Relaxed);
    let batches_timer = self.batches_timer.load(Ordering::Relaxed);
    let batches_close = self.batches_close.load(Ordering::Relaxed);

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      evicted_by_ttl: self.evicted_by_ttl.load(Ordering::Relaxed),
      batches_dispatched: batches_full + batches_timer + batches_close,
      batches_full,
      batches_timer,
      batches_close,
      keys_fetched: self.keys_fetched.load(Ordering::Relaxed),
      fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
      unresolved: self.unresolved.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of a loader's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Loads answered from the result cache.
  pub hits: u64,
  /// Loads that had to join a batch.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Entries removed by the background sweep.
  pub evicted_by_ttl: u64,
  /// Total number of fetch invocations.
  pub batches_dispatched: u64,
  /// Batches dispatched because they reached `max_batch`.
  pub batches_full: u64,
  /// Batches dispatched because their wait window elapsed.
  pub batches_timer: u64,
  /// Batches dispatched by `close()`.
  pub batches_close: u64,
  /// Total number of keys handed to the fetch function, duplicates included.
  pub keys_fetched: u64,
  /// Keys for which the fetch function reported an error.
  pub fetch_errors: u64,
  /// Keys that got no result at all (short result list or abandoned batch).
  pub unresolved: u64,
  /// The number of seconds the loader has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("evicted_by_ttl", &self.evicted_by_ttl)
      .field("batches_dispatched", &self.batches_dispatched)
      .field("batches_full", &self.batches_full)
      .field("batches_timer", &self.batches_timer)
      .field("batches_close", &self.batches_close)
      .field("keys_fetched", &self.keys_fetched)
      .field("fetch_errors", &self.fetch_errors)
      .field("unresolved", &self.unresolved)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
