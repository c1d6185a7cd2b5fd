//! Request-scoped loaders for the Posts service.
//!
//! Every inbound request gets its own [`RequestLoaders`]: one batching,
//! caching loader each for users, posts and comments, all fed by the
//! repositories' "get by ids" lookups. Resolvers that need an author or a
//! parent post call `load` and the lookups they issue during one wait window
//! are served by a single repository query.

pub mod config;
pub mod domain;
pub mod error;
pub mod scope;
pub mod source;

pub use config::LoadersConfig;
pub use domain::{Comment, Identified, Post, User};
pub use error::{Error, Result, SourceError};
pub use scope::{EntityLoader, RequestLoaders, Sources};
pub use source::{batch_fetch, IdsSource, InMemorySource};
