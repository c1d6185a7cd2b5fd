use crate::error::{LoadError, LoadResult};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

/// Represents a caller parked on a `Batch`.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

/// The internal state of a batch's results.
pub(crate) enum State<V, E> {
  Pending,
  Complete(Box<[LoadResult<V, E>]>),
}

pub(crate) struct Inner<V, E> {
  pub(crate) state: State<V, E>,
  pub(crate) waiters: VecDeque<Waiter>,
}

/// The completion side of one dispatch cycle.
///
/// The keys of an open batch live in the loader state, guarded by the loader
/// lock. This half is shared with every caller that joined the batch, and can
/// be awaited by sync threads and async tasks simultaneously.
pub(crate) struct Batch<V, E> {
  /// Set under the loader lock when the batch is detached for dispatch.
  dispatched: AtomicBool,
  inner: Mutex<Inner<V, E>>,
}

impl<V, E> Batch<V, E> {
  pub(crate) fn new() -> Self {
    Self {
      dispatched: AtomicBool::new(false),
      inner: Mutex::new(Inner {
        state: State::Pending,
        waiters: VecDeque::new(),
      }),
    }
  }

  #[inline]
  pub(crate) fn is_dispatched(&self) -> bool {
    self.dispatched.load(Ordering::Acquire)
  }

  #[inline]
  pub(crate) fn mark_dispatched(&self) {
    self.dispatched.store(true, Ordering::Release);
  }

  /// Publishes the results and wakes every waiter. Only the first call has
  /// any effect.
  pub(crate) fn complete(&self, results: Box<[LoadResult<V, E>]>) {
    let mut inner = self.inner.lock();
    if matches!(inner.state, State::Complete(_)) {
      return;
    }
    inner.state = State::Complete(results);
    for waiter in inner.waiters.drain(..) {
      waiter.wake();
    }
  }
}

/// A caller's place in a batch: which batch it joined and at which index its
/// key was appended.
pub(crate) struct Ticket<V, E> {
  pub(crate) batch: Arc<Batch<V, E>>,
  pub(crate) index: usize,
}

impl<V, E> Ticket<V, E> {
  fn result(&self, results: &[LoadResult<V, E>]) -> LoadResult<V, E> {
    results
      .get(self.index)
      .cloned()
      .unwrap_or(Err(LoadError::MissingResult { index: self.index }))
  }

  /// Blocks the current thread until the batch completes.
  ///
  /// The thread is queued once; `complete` drains the queue under the same
  /// lock, so after a spurious wakeup the earlier entry is still there.
  pub(crate) fn wait_blocking(&self) -> LoadResult<V, E> {
    let mut inner = self.batch.inner.lock();
    let mut queued = false;
    loop {
      match &inner.state {
        State::Complete(results) => return self.result(results),
        State::Pending => {
          if !queued {
            inner.waiters.push_back(Waiter::Sync(thread::current()));
            queued = true;
          }
          drop(inner); // Unlock before parking.
          thread::park();
          inner = self.batch.inner.lock();
        }
      }
    }
  }

  /// Returns a future that resolves once the batch completes.
  pub(crate) fn wait(self) -> BatchWait<V, E> {
    BatchWait { ticket: self }
  }
}

/// A key offered by `load_many` that is either already answered or waiting.
pub(crate) enum Pending<V, E> {
  Ready(LoadResult<V, E>),
  Waiting(Ticket<V, E>),
}

/// The future returned by `Ticket::wait`.
///
/// Dropping it only forgets this caller; the batch is still dispatched and
/// completed for everyone else.
#[must_use = "futures do nothing unless you .await or poll them"]
pub(crate) struct BatchWait<V, E> {
  ticket: Ticket<V, E>,
}

impl<V, E> Future for BatchWait<V, E> {
  type Output = LoadResult<V, E>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let ticket = &self.ticket;
    let mut inner = ticket.batch.inner.lock();
    match &inner.state {
      State::Complete(results) => Poll::Ready(ticket.result(results)),
      State::Pending => {
        let already_queued = inner.waiters.iter().any(|waiter| match waiter {
          Waiter::Async(waker) => waker.will_wake(cx.waker()),
          Waiter::Sync(_) => false,
        });
        if !already_queued {
          inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
        }
        Poll::Pending
      }
    }
  }
}
