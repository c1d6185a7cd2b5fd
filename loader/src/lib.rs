//! A batching, caching data loader with sync and async handles.
//!
//! Many independent callers asking for single keys at about the same time are
//! collapsed into a few calls of one batch fetch function, which is the usual
//! cure for N+1 lookups when resolving graph-shaped queries.
//!
//! # Features
//! - **Batching**: keys accumulate in one open batch, dispatched when it holds
//!   `max_batch` keys or when its wait window elapses, whichever comes first.
//! - **Per-key outcomes**: every caller gets the result at its own key's
//!   position; one failing key never fails its neighbours.
//! - **Result cache**: successful results are served for a time-to-live and
//!   evicted by a background sweep. Errors are never cached.
//! - **Sync & Async**: `Loader` parks threads, `AsyncLoader` suspends tasks.
//! - **Non-Clone Support**: values are handed out as `Arc<V>`.
//!
//! Loaders are meant to be scoped: build a fresh set per inbound request, pass
//! them to whatever resolves the request, and `close()` them at the end.

// Public modules that form the API
pub mod builder;
pub mod config;
pub mod error;
pub mod handles;
pub mod metrics;
pub mod runtime;

// Internal, crate-only modules
mod batch;
mod entry;
mod fetch;
mod shared;
mod task;

// Re-export the primary user-facing types for convenience
pub use builder::LoaderBuilder;
pub use config::LoaderConfig;
pub use error::{BuildError, LoadError, LoadResult};
pub use handles::{AsyncLoader, Loader};
pub use metrics::MetricsSnapshot;
pub use runtime::TaskSpawner;
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
