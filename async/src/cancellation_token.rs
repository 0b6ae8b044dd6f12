//! Cancellation tokens used to stop producer pumps.
//!
//! Every cancellable effect is driven by a pump task that selects on a token
//! handed out by the registry's [`TaskPool`](crate::TaskPool). Cancelling the
//! token detaches the pump from its upstream; the upstream is simply dropped,
//! it is never asked to cooperate.
//!
//! # Example
//!
//! ```no_run
//! use quell_async::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pool_token = CancellationToken::new();
//! let pump_token = pool_token.child_token();
//!
//! tokio::spawn(async move {
//!     pump_token.cancelled().await;
//!     println!("Pump detached");
//! });
//!
//! // Shutting down the pool stops every pump
//! pool_token.cancel();
//! # });
//! ```

/// A token for signalling cancellation to a pump task.
///
/// Currently `tokio_util`'s token. A child token is cancelled when its parent
/// is, but cancelling a child leaves the parent and its siblings untouched,
/// which is exactly the relationship between the registry's pool and a single
/// effect instance.
#[cfg(feature = "tokio")]
pub type CancellationToken = tokio_util::sync::CancellationToken;
