use std::{future::Future, pin::Pin, time::Duration};

/// A trait for running an `AsyncLoader`'s background work on an asynchronous
/// runtime: batch dispatches and wait-window timers.
pub trait TaskSpawner: Send + Sync + 'static {
  /// Spawns a type-erased future.
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);

  /// Returns a future that completes after `duration` on this runtime's timer.
  fn delay(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;

  /// Runs a blocking closure, such as a synchronous fetch function, where it
  /// cannot stall the runtime's workers.
  ///
  /// The default runs it inline on the calling thread; override it when the
  /// runtime has a blocking pool.
  fn spawn_blocking(&self, task: Box<dyn FnOnce() + Send>) {
    task();
  }
}

#[cfg(feature = "tokio")]
pub struct TokioSpawner(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioSpawner {
  /// Creates a spawner that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  /// Creates a spawner for the current Tokio runtime, if there is one.
  pub fn try_current() -> Option<Self> {
    tokio::runtime::Handle::try_current().ok().map(Self)
  }
}

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioSpawner {
  fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
    self.0.spawn(future);
  }

  fn delay(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    // The sleep is created on first poll, inside the runtime.
    Box::pin(async move { tokio::time::sleep(duration).await })
  }

  fn spawn_blocking(&self, task: Box<dyn FnOnce() + Send>) {
    self.0.spawn_blocking(task);
  }
}
