use fibre_loader::BuildError;
use thiserror::Error;

/// The main error type for the `posts_loaders` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Failed to read loader configuration: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse loader configuration: {0}")]
  ConfigParse(String),

  #[error("Failed to build the {entity} loader: {source}")]
  Build {
    entity: &'static str,
    #[source]
    source: BuildError,
  },
}

/// A failure reported by an id source for a whole lookup.
///
/// The loader hands a clone of it to every key of the failed batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("source unavailable: {0}")]
  Unavailable(String),

  #[error("query failed: {0}")]
  Query(String),
}

/// A specialized `Result` type for `posts_loaders` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
