//! Spinlock-based synchronization primitives for O(1) operations.
//!
//! Each effect relay keeps its buffer behind one of these: every operation is
//! a queue push/pop or a flag flip, and the lock is never held across an
//! await point or a user callback.
//!
//! # When NOT to use these primitives
//!
//! - O(n) work while holding the lock (move the data out, drop it outside)
//! - Holding the lock across await points
//! - Calling anything that might take the same lock again
//!
//! # Example
//!
//! ```
//! use quell_async::sync::spin::Mutex;
//! use std::collections::VecDeque;
//!
//! let queue: Mutex<VecDeque<u32>> = Mutex::new(VecDeque::new());
//! queue.lock().push_back(1);
//! assert_eq!(queue.lock().pop_front(), Some(1));
//! ```

pub use spin::MutexGuard;

/// A spinlock-based mutex for O(1) operations.
///
/// Thin wrapper around `spin::Mutex`.
#[derive(Debug, Default)]
pub struct Mutex<T>(spin::Mutex<T>);

impl<T> Mutex<T> {
    /// Creates a new Mutex containing the given value.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(spin::Mutex::new(value))
    }

    /// Acquires the lock, spinning until it becomes available.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }

    /// Attempts to acquire the lock without spinning.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.0.try_lock()
    }

    /// Consumes the mutex and returns the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0.into_inner()
    }

    /// Returns a mutable reference to the inner value.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}

/// A write-once cell.
///
/// Used for values that are only known after the owning object has been
/// shared, such as a registration key that is assigned after the handle was
/// handed to the registry.
#[derive(Debug, Default)]
pub struct Once<T>(spin::Once<T>);

impl<T> Once<T> {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(spin::Once::new())
    }

    /// Stores `value` if the cell is empty, returning the stored value.
    ///
    /// A second call leaves the first value in place.
    #[inline]
    pub fn set(&self, value: T) -> &T {
        self.0.call_once(|| value)
    }

    /// Returns the stored value, if any.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.0.get()
    }
}
