use crate::domain::Identified;
use crate::error::SourceError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tracing::error;
use uuid::Uuid;

/// A repository that can look records up by a set of ids in one query.
///
/// Implementations return the records they found, in any order. Ids with no
/// record are simply absent from the result.
#[async_trait]
pub trait IdsSource<T>: Send + Sync {
  async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, SourceError>;
}

/// The result list a loader fetch produces for records of type `T`.
pub type FetchResults<T> = Vec<Result<Option<T>, SourceError>>;

/// Adapts an `IdsSource` into a loader fetch function.
///
/// Records are realigned to the requested ids; an id with no record resolves
/// to `Ok(None)`, which the loader caches like any other result. When the
/// source fails the whole lookup, the failure is logged once and handed to
/// every id of the batch.
pub fn batch_fetch<T>(
  source: Arc<dyn IdsSource<T>>,
) -> impl Fn(Vec<Uuid>) -> BoxFuture<'static, FetchResults<T>> + Send + Sync + 'static
where
  T: Identified + Clone + Send + Sync + 'static,
{
  move |ids: Vec<Uuid>| {
    let source = Arc::clone(&source);
    async move {
      match source.get_by_ids(&ids).await {
        Ok(records) => align(&ids, records),
        Err(err) => {
          error!(op = "batch_fetch", keys = ids.len(), error = %err, "id source lookup failed");
          ids.iter().map(|_| Err(err.clone())).collect()
        }
      }
    }
    .boxed()
  }
}

fn align<T: Identified + Clone>(ids: &[Uuid], records: Vec<T>) -> FetchResults<T> {
  let by_id: HashMap<Uuid, T> = records
    .into_iter()
    .map(|record| (record.id(), record))
    .collect();
  ids.iter().map(|id| Ok(by_id.get(id).cloned())).collect()
}

/// An in-memory repository.
///
/// Counts its lookups and can be switched into a failing state, which makes it
/// handy for exercising loaders.
#[derive(Debug)]
pub struct InMemorySource<T> {
  records: RwLock<HashMap<Uuid, T>>,
  failure: RwLock<Option<SourceError>>,
  lookups: AtomicUsize,
}

impl<T> Default for InMemorySource<T> {
  fn default() -> Self {
    Self {
      records: RwLock::new(HashMap::new()),
      failure: RwLock::new(None),
      lookups: AtomicUsize::new(0),
    }
  }
}

impl<T: Identified> InMemorySource<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
    let source = Self::new();
    for record in records {
      source.insert(record);
    }
    source
  }

  /// Inserts or replaces a record.
  pub fn insert(&self, record: T) {
    self.records.write().insert(record.id(), record);
  }

  pub fn remove(&self, id: &Uuid) -> Option<T> {
    self.records.write().remove(id)
  }

  /// Makes every following lookup fail with `err`, or succeed again on `None`.
  pub fn set_failure(&self, err: Option<SourceError>) {
    *self.failure.write() = err;
  }

  /// The number of `get_by_ids` calls served so far.
  pub fn lookups(&self) -> usize {
    self.lookups.load(Ordering::Relaxed)
  }
}

#[async_trait]
impl<T> IdsSource<T> for InMemorySource<T>
where
  T: Identified + Clone + Send + Sync,
{
  async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, SourceError> {
    self.lookups.fetch_add(1, Ordering::Relaxed);
    if let Some(err) = self.failure.read().clone() {
      return Err(err);
    }
    let records = self.records.read();
    Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::User;
  use pretty_assertions::assert_eq;

  #[test]
  fn align_follows_requested_order() {
    let ann = User::new("ann");
    let bob = User::new("bob");
    let missing = Uuid::new_v4();
    let ids = vec![bob.id, missing, ann.id, bob.id];

    let aligned = align(&ids, vec![ann.clone(), bob.clone()]);
    assert_eq!(
      aligned,
      vec![Ok(Some(bob.clone())), Ok(None), Ok(Some(ann)), Ok(Some(bob))]
    );
  }
}
