use std::fmt;
use std::sync::Arc;

/// Errors that can occur when building a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The loader was configured with a `max_batch` of zero. A batch must be
  /// allowed to hold at least one key.
  ZeroMaxBatch,
  /// No fetch function was provided.
  FetchRequired,
  /// `build()` was called with an `async_fetch` function. A blocking `Loader`
  /// can only drive a synchronous fetch; use `build_async()` instead.
  SyncFetchRequired,
  /// `build_async()` was called without a `TaskSpawner`, and either the
  /// default `tokio` feature is disabled or no Tokio runtime is current.
  SpawnerRequired,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroMaxBatch => write!(f, "max batch size cannot be zero"),
      BuildError::FetchRequired => write!(f, "a loader requires a fetch function"),
      BuildError::SyncFetchRequired => write!(
        f,
        "a blocking loader requires a synchronous fetch function"
      ),
      BuildError::SpawnerRequired => write!(
        f,
        "an async loader requires a task spawner or a current tokio runtime"
      ),
    }
  }
}

impl std::error::Error for BuildError {}

/// The error a caller receives from `load` when its key could not be resolved.
///
/// Errors reported by the fetch function are shared between every caller that
/// requested the failing key, hence the `Arc`.
#[derive(Debug)]
pub enum LoadError<E> {
  /// The fetch function reported an error for this key.
  Fetch(Arc<E>),
  /// The fetch function returned fewer results than it was given keys, and
  /// none was returned for the key at `index` in its batch.
  MissingResult { index: usize },
  /// The batch was abandoned before the fetch completed (the fetch panicked,
  /// or the runtime dropped the dispatch task).
  Abandoned,
}

impl<E> LoadError<E> {
  /// Returns the fetch function's error, if that is what caused the failure.
  pub fn fetch_error(&self) -> Option<&E> {
    match self {
      LoadError::Fetch(err) => Some(err.as_ref()),
      _ => None,
    }
  }
}

// Manual impl, `E` does not need to be `Clone`.
impl<E> Clone for LoadError<E> {
  fn clone(&self) -> Self {
    match self {
      LoadError::Fetch(err) => LoadError::Fetch(Arc::clone(err)),
      LoadError::MissingResult { index } => LoadError::MissingResult { index: *index },
      LoadError::Abandoned => LoadError::Abandoned,
    }
  }
}

impl<E: fmt::Display> fmt::Display for LoadError<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoadError::Fetch(err) => write!(f, "{}", err),
      LoadError::MissingResult { index } => write!(
        f,
        "fetch returned no result for the key at batch position {}",
        index
      ),
      LoadError::Abandoned => write!(f, "batch was abandoned before the fetch completed"),
    }
  }
}

impl<E> std::error::Error for LoadError<E>
where
  E: std::error::Error + 'static,
{
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      LoadError::Fetch(err) => Some(&**err),
      _ => None,
    }
  }
}

/// The outcome of a single `load`.
pub type LoadResult<V, E> = Result<Arc<V>, LoadError<E>>;
