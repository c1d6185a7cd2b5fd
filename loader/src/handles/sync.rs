use crate::batch::{Pending, Ticket};
use crate::error::LoadResult;
use crate::fetch::DispatchTrigger;
use crate::shared::{Dispatch, Enqueued, LoaderShared};
use crate::task::timer;
use crate::MetricsSnapshot;

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

/// A thread-safe, blocking batching loader.
///
/// Every `load` that misses the cache joins the open batch and parks the
/// calling thread until that batch's fetch completes.
#[derive(Debug)]
pub struct Loader<K, V, E> {
  pub(crate) shared: Arc<LoaderShared<K, V, E>>,
}

impl<K, V, E> Clone for Loader<K, V, E> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<K, V, E> Loader<K, V, E>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Loads the value for `key`.
  ///
  /// A fresh cached result is returned immediately. Otherwise the key joins
  /// the open batch and this call blocks until the batch is fetched. If the
  /// key fills the batch, the fetch runs on this thread before it waits.
  pub fn load(&self, key: K) -> LoadResult<V, E> {
    match self.shared.enqueue(key) {
      Enqueued::Hit(value) => Ok(value),
      Enqueued::Joined {
        ticket,
        opened,
        full,
      } => {
        self.drive(&ticket, opened, full);
        ticket.wait_blocking()
      }
    }
  }

  /// Loads several keys, returning their results in input order.
  ///
  /// All keys are enqueued before this call waits on any of them, so a single
  /// caller can fill whole batches on its own.
  pub fn load_many<I>(&self, keys: I) -> Vec<LoadResult<V, E>>
  where
    I: IntoIterator<Item = K>,
  {
    let pending: Vec<Pending<V, E>> = keys
      .into_iter()
      .map(|key| match self.shared.enqueue(key) {
        Enqueued::Hit(value) => Pending::Ready(Ok(value)),
        Enqueued::Joined {
          ticket,
          opened,
          full,
        } => {
          self.drive(&ticket, opened, full);
          Pending::Waiting(ticket)
        }
      })
      .collect();

    pending
      .into_iter()
      .map(|pending| match pending {
        Pending::Ready(result) => result,
        Pending::Waiting(ticket) => ticket.wait_blocking(),
      })
      .collect()
  }

  /// Dispatches the open batch, if any, on the current thread.
  ///
  /// Use this when the scope that owns the loader ends, so no caller is left
  /// waiting out the wait window. Does nothing when no batch is open.
  pub fn close(&self) {
    if let Some(dispatch) = self.shared.detach_current(DispatchTrigger::Close) {
      self.shared.run_blocking(dispatch);
    }
  }

  /// Removes `key` from the result cache. Returns whether it was cached.
  pub fn forget<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.shared.forget(key)
  }

  /// Removes every entry from the result cache.
  pub fn clear_cache(&self) {
    self.shared.clear_cache();
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }

  fn drive(&self, ticket: &Ticket<V, E>, opened: bool, full: Option<Dispatch<K, V, E>>) {
    match full {
      Some(dispatch) => self.shared.run_blocking(dispatch),
      None if opened => timer::spawn_thread(&self.shared, Arc::clone(&ticket.batch)),
      None => {}
    }
  }
}
