//! The public handles of a loader.
//!
//! `Loader` parks the calling thread while its batch is in flight;
//! `AsyncLoader` suspends the calling task instead. Both are thin views over
//! the same shared core and are cheap to clone.

mod futures;
mod sync;

pub use futures::AsyncLoader;
pub use sync::Loader;
