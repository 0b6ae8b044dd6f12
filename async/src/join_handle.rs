//! Handle to a spawned pump task.
//!
//! Dropping the handle detaches the task; it keeps running until its token
//! is cancelled or its upstream ends.

/// A handle to a spawned task that can be awaited for its result.
#[cfg(feature = "tokio")]
pub type JoinHandle<T> = tokio::task::JoinHandle<T>;
