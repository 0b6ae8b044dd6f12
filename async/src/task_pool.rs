//! Task pool tracking the pump tasks of in-flight effects.
//!
//! A pump drives one effect's upstream into its relay. Pumps are spawned
//! through a [`TaskPool`] so that the owner (the cancellation registry) can
//! stop all of them at once and wait for them to unwind.
//!
//! # Pattern
//!
//! Shutdown happens in three phases:
//! 1. **Signal**: Cancel the pool token, and with it every child token
//! 2. **Close**: Mark the tracker closed so `wait` can finish
//! 3. **Wait**: Block until every tracked pump has returned
//!
//! # Example
//!
//! ```no_run
//! use quell_async::task_pool::TaskPool;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pool = TaskPool::new();
//!
//! let token = pool.child_token();
//! pool.spawn(async move {
//!     token.cancelled().await;
//! });
//!
//! pool.shutdown().await;
//! # });
//! ```

use crate::{CancellationToken, JoinHandle};

/// Tracks a group of cancellable tasks with graceful shutdown.
///
/// Combines a [`CancellationToken`] with a [`tokio_util::task::TaskTracker`].
/// Each pump receives its own [`child_token()`](TaskPool::child_token) so it
/// can be cancelled individually, while [`shutdown()`](TaskPool::shutdown)
/// still reaches all of them.
#[derive(Debug)]
pub struct TaskPool {
    cancel_token: CancellationToken,
    task_tracker: tokio_util::task::TaskTracker,
}

impl TaskPool {
    /// Creates a new task pool.
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            task_tracker: tokio_util::task::TaskTracker::new(),
        }
    }

    /// Returns a reference to the pool's cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Creates a child token, cancelled either directly or when the pool
    /// shuts down.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use quell_async::task_pool::TaskPool;
    /// let pool = TaskPool::new();
    /// let child = pool.child_token();
    ///
    /// // Stops one pump, the pool keeps running
    /// child.cancel();
    /// assert!(!pool.is_cancelled());
    /// ```
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    /// Spawns a task tracked by this pool.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: core::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.task_tracker.spawn(task)
    }

    /// Number of tracked tasks that have not yet returned.
    pub fn active(&self) -> usize {
        self.task_tracker.len()
    }

    /// Cancels every task, closes the tracker and waits for all tracked tasks
    /// to return.
    ///
    /// Tasks spawned after this call are still tracked, but their child
    /// tokens are born cancelled.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }

    /// Returns `true` once [`shutdown()`](TaskPool::shutdown) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}
