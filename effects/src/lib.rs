//! Identifier-keyed cancellation for effect streams.
//!
//! An [`Effect`] is a lazily started stream of `Result<T, E>` values produced
//! by some side-effecting work. Wrapping an effect with
//! [`Effect::cancellable`] tags every running instance of it with an
//! [`EffectId`] in a shared [`CancellationRegistry`]; a later
//! [`CancellationRegistry::cancel`] (or the [`Effect::cancel`] effect) stops
//! every instance carrying that identifier.
//!
//! Values that the upstream produces before the consumer starts reading are
//! buffered and replayed, so subscribing never loses output.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use quell::{CancellationRegistry, Effect};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = CancellationRegistry::new();
//!
//! let mut search = Effect::<u32>::sequence([1, 2, 3]).cancellable("search", true, &registry);
//!
//! while let Some(value) = search.next().await {
//!     println!("{value:?}");
//! }
//!
//! registry.cancel(&"search".into());
//! # });
//! ```

mod cancellable;
mod disposal;
mod group;
mod id;
mod replay;

pub mod config;
pub mod effect;
pub mod error;
pub mod registry;

use std::sync::Arc;
use tracing::{debug, error, trace, warn};

#[cfg(feature = "instrument")]
use tracing::instrument;

pub use config::Config;
pub use disposal::DisposalHandle;
pub use effect::{Effect, EffectEvents};
pub use error::{Error, Result};
pub use group::{DisposableGroup, RemovalKey};
pub use id::EffectId;
pub use registry::CancellationRegistry;
pub use replay::Replay;
