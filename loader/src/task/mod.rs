//! Background tasks of a loader: the sweeper that evicts expired cache
//! entries, and the wait-window timers that dispatch open batches.

pub(crate) mod sweeper;
pub(crate) mod timer;
