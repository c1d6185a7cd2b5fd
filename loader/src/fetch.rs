use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

/// A boxed future resolving to one result per submitted key.
pub(crate) type FetchFuture<V, E> = BoxFuture<'static, Vec<Result<V, E>>>;

/// An enum that holds either a synchronous or an asynchronous fetch function.
///
/// Both flavours receive every key of a dispatched batch, duplicates included,
/// in arrival order, and must return one `Result` per key in the same order.
pub(crate) enum Fetcher<K, V, E> {
  Sync(Arc<dyn Fn(&[K]) -> Vec<Result<V, E>> + Send + Sync>),
  Async(Arc<dyn Fn(Vec<K>) -> FetchFuture<V, E> + Send + Sync>),
}

impl<K, V, E> Clone for Fetcher<K, V, E> {
  fn clone(&self) -> Self {
    match self {
      Fetcher::Sync(f) => Fetcher::Sync(f.clone()),
      Fetcher::Async(f) => Fetcher::Async(f.clone()),
    }
  }
}

impl<K, V, E> fmt::Debug for Fetcher<K, V, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Fetcher::Sync(_) => f.write_str("Fetcher::Sync"),
      Fetcher::Async(_) => f.write_str("Fetcher::Async"),
    }
  }
}

/// What caused a batch to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchTrigger {
  /// The batch reached `max_batch` keys.
  Full,
  /// The wait window elapsed.
  Timer,
  /// The loader was closed with the batch still open.
  Close,
}

impl fmt::Display for DispatchTrigger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DispatchTrigger::Full => write!(f, "full"),
      DispatchTrigger::Timer => write!(f, "timer"),
      DispatchTrigger::Close => write!(f, "close"),
    }
  }
}
