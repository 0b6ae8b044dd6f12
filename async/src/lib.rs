//! Runtime-agnostic primitives for the quell effect runtime.
//!
//! The effect registry needs a small set of building blocks that are not
//! specific to effects themselves: a lock that tolerates re-entrant
//! acquisition from disposal callbacks, a cheap spinlock for O(1) per-stream
//! state, cancellation tokens for stopping producer pumps, and a task pool
//! that tracks those pumps so they can be shut down together.
//!
//! # Features
//!
//! - **Lock**: Re-entrant mutual exclusion with a scoped `with_lock` helper
//! - **TaskPool**: Tracks pump tasks and cancels them on shutdown
//! - **CancellationToken**: Hierarchical cancellation for pump tasks
//!
//! # Example
//!
//! ```no_run
//! use quell_async::TaskPool;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pool = TaskPool::new();
//! let cancel = pool.child_token();
//!
//! pool.spawn(async move {
//!     loop {
//!         tokio::select! {
//!             _ = produce() => {}
//!             _ = cancel.cancelled() => break,
//!         }
//!     }
//! });
//!
//! pool.shutdown().await;
//! # });
//!
//! # async fn produce() {}
//! ```

mod spawn;

pub mod cancellation_token;
pub mod join_handle;
pub mod sync;
#[cfg(feature = "tokio")]
pub mod task_pool;
pub mod time;

#[cfg(feature = "tokio")]
pub use cancellation_token::CancellationToken;
#[cfg(feature = "tokio")]
pub use join_handle::JoinHandle;
pub use sync::reentrant::Lock;
#[cfg(feature = "tokio")]
pub use task_pool::TaskPool;
