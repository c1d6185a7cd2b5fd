use crate::config::LoadersConfig;
use crate::domain::{Comment, Identified, Post, User};
use crate::error::{Error, Result, SourceError};
use crate::source::{batch_fetch, IdsSource};

use std::sync::Arc;

use fibre_loader::{AsyncLoader, LoaderBuilder, LoaderConfig};
use tracing::debug;
use uuid::Uuid;

/// A loader of records of type `T` by id. `None` means no such record.
pub type EntityLoader<T> = AsyncLoader<Uuid, Option<T>, SourceError>;

/// The repositories a request scope loads from. Built once and shared by
/// every request.
#[derive(Clone)]
pub struct Sources {
  pub users: Arc<dyn IdsSource<User>>,
  pub posts: Arc<dyn IdsSource<Post>>,
  pub comments: Arc<dyn IdsSource<Comment>>,
}

/// The loaders of a single request.
///
/// Create one at request entry, hand it to everything resolving the request,
/// and `close` it at the end. Loaders are never shared between requests, so
/// cached results do not outlive the request that fetched them by much.
#[derive(Debug, Clone)]
pub struct RequestLoaders {
  pub users: EntityLoader<User>,
  pub posts: EntityLoader<Post>,
  pub comments: EntityLoader<Comment>,
}

impl RequestLoaders {
  /// Builds a fresh set of loaders. Must be called within a Tokio runtime.
  pub fn new(sources: &Sources, config: &LoadersConfig) -> Result<Self> {
    debug!("creating request loaders");
    Ok(Self {
      users: build_loader("user", Arc::clone(&sources.users), &config.users)?,
      posts: build_loader("post", Arc::clone(&sources.posts), &config.posts)?,
      comments: build_loader("comment", Arc::clone(&sources.comments), &config.comments)?,
    })
  }

  /// Dispatches whatever each loader still has pending.
  pub fn close(&self) {
    self.users.close();
    self.posts.close();
    self.comments.close();
  }
}

fn build_loader<T>(
  entity: &'static str,
  source: Arc<dyn IdsSource<T>>,
  config: &LoaderConfig,
) -> Result<EntityLoader<T>>
where
  T: Identified + Clone + Send + Sync + 'static,
{
  LoaderBuilder::from_config(config)
    .async_fetch(batch_fetch(source))
    .build_async()
    .map_err(|source| Error::Build { entity, source })
}
