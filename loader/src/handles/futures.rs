use crate::batch::{Pending, Ticket};
use crate::error::LoadResult;
use crate::fetch::DispatchTrigger;
use crate::shared::{Dispatch, Enqueued, LoaderShared};
use crate::task::timer;
use crate::{MetricsSnapshot, TaskSpawner};

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A thread-safe, asynchronous batching loader.
///
/// Dispatches always run as tasks on the loader's `TaskSpawner`, never inside
/// the caller's future, so cancelling a `load` cannot strand the other
/// callers of its batch. A synchronous fetch function is run through
/// `TaskSpawner::spawn_blocking`, keeping it off the runtime's workers.
pub struct AsyncLoader<K, V, E> {
  pub(crate) shared: Arc<LoaderShared<K, V, E>>,
  pub(crate) spawner: Arc<dyn TaskSpawner>,
}

impl<K, V, E> Clone for AsyncLoader<K, V, E> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
      spawner: Arc::clone(&self.spawner),
    }
  }
}

impl<K, V, E> fmt::Debug for AsyncLoader<K, V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncLoader")
      .field("shared", &self.shared)
      .finish_non_exhaustive()
  }
}

impl<K, V, E> AsyncLoader<K, V, E>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Loads the value for `key`.
  ///
  /// A fresh cached result is returned without suspending. Otherwise the key
  /// joins the open batch and the returned future resolves once that batch
  /// has been fetched.
  pub async fn load(&self, key: K) -> LoadResult<V, E> {
    match self.shared.enqueue(key) {
      Enqueued::Hit(value) => Ok(value),
      Enqueued::Joined {
        ticket,
        opened,
        full,
      } => {
        self.drive(&ticket, opened, full);
        ticket.wait().await
      }
    }
  }

  /// Loads several keys, returning their results in input order.
  ///
  /// All keys are enqueued before the first one is awaited.
  pub async fn load_many<I>(&self, keys: I) -> Vec<LoadResult<V, E>>
  where
    I: IntoIterator<Item = K>,
  {
    let mut pending = Vec::new();
    for key in keys {
      let entry = match self.shared.enqueue(key) {
        Enqueued::Hit(value) => Pending::Ready(Ok(value)),
        Enqueued::Joined {
          ticket,
          opened,
          full,
        } => {
          self.drive(&ticket, opened, full);
          Pending::Waiting(ticket)
        }
      };
      pending.push(entry);
    }

    let mut results = Vec::with_capacity(pending.len());
    for entry in pending {
      results.push(match entry {
        Pending::Ready(result) => result,
        Pending::Waiting(ticket) => ticket.wait().await,
      });
    }
    results
  }

  /// Hands the open batch, if any, to the runtime for immediate dispatch.
  ///
  /// Does not wait for the fetch; pending `load`s resolve as soon as it
  /// completes. Does nothing when no batch is open.
  pub fn close(&self) {
    if let Some(dispatch) = self.shared.detach_current(DispatchTrigger::Close) {
      self.spawn_dispatch(dispatch);
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
      Some(dispatch) => self.spawn_dispatch(dispatch),
      None if opened => timer::spawn_task(&self.spawner, &self.shared, Arc::clone(&ticket.batch)),
      None => {}
    }
  }

  fn spawn_dispatch(&self, dispatch: Dispatch<K, V, E>) {
    LoaderShared::spawn_run(&self.shared, &self.spawner, dispatch);
  }
}
