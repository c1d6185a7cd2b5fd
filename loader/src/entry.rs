use std::sync::Arc;
use std::time::{Duration, Instant};

/// A successfully fetched value held in the loader's result cache.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  /// The fetched value, shared with every caller it was handed to.
  value: Arc<V>,
  /// When the fetch result was stored.
  stored_at: Instant,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: Arc<V>) -> Self {
    Self {
      value,
      stored_at: Instant::now(),
    }
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  /// An entry is still fresh while its age is at most `ttl`.
  #[inline]
  pub(crate) fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(self.stored_at) <= ttl
  }
}
