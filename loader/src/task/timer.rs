use crate::batch::Batch;
use crate::runtime::TaskSpawner;
use crate::shared::LoaderShared;

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::thread;

/// Starts the wait-window timer of a freshly opened batch on its own thread.
///
/// When the window elapses the batch is dispatched on that thread, unless it
/// was dispatched in the meantime or the loader was dropped, in which case the
/// timer does nothing. The timer never keeps the loader alive.
pub(crate) fn spawn_thread<K, V, E>(shared: &Arc<LoaderShared<K, V, E>>, batch: Arc<Batch<V, E>>)
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  let wait = shared.wait;
  let shared = Arc::downgrade(shared);
  thread::spawn(move || {
    thread::sleep(wait);
    fire_blocking(&shared, &batch);
  });
}

fn fire_blocking<K, V, E>(shared: &Weak<LoaderShared<K, V, E>>, batch: &Arc<Batch<V, E>>)
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  if batch.is_dispatched() {
    return;
  }
  let Some(shared) = shared.upgrade() else {
    return;
  };
  if let Some(dispatch) = shared.detach_if_open(batch) {
    shared.run_blocking(dispatch);
  }
}

/// Starts the wait-window timer of a freshly opened batch as a task on the
/// spawner's runtime.
pub(crate) fn spawn_task<K, V, E>(
  spawner: &Arc<dyn TaskSpawner>,
  shared: &Arc<LoaderShared<K, V, E>>,
  batch: Arc<Batch<V, E>>,
) where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  let delay = spawner.delay(shared.wait);
  let weak = Arc::downgrade(shared);
  let task_spawner = Arc::clone(spawner);
  spawner.spawn(Box::pin(async move {
    delay.await;
    if batch.is_dispatched() {
      return;
    }
    let Some(shared) = weak.upgrade() else {
      return;
    };
    if let Some(dispatch) = shared.detach_if_open(&batch) {
      if shared.fetches_blocking() {
        LoaderShared::spawn_run(&shared, &task_spawner, dispatch);
      } else {
        shared.run(dispatch).await;
      }
    }
  }));
}
