//! Synchronization primitives, organized by their characteristics.
//!
//! # Submodules
//!
//! - [`spin`] - Spinlocks for O(1) state on hot paths (per-stream relays)
//! - [`reentrant`] - A blocking lock the owning thread may re-acquire
//!
//! # Choosing the Right Primitive
//!
//! | Use Case | Primitive |
//! |----------|-----------|
//! | O(1) ops, hot path, never re-entered | [`spin::Mutex`] |
//! | Write-once slot filled after publication | [`spin::Once`] |
//! | Callbacks may call back into the lock holder | [`reentrant::Lock`] |

pub mod reentrant;
pub mod spin;
