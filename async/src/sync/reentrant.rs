//! A lock that the owning thread may acquire again without deadlocking.
//!
//! The cancellation registry disposes handles while holding its lock, and a
//! disposal action removes its own handle from the registry, which takes the
//! same lock. [`Lock`] lets that nested acquisition succeed on the owning
//! thread while other threads still block until the outermost guard is
//! dropped.
//!
//! The guard only hands out `&T`. State that must be mutated goes in a
//! `RefCell`, and callers must not keep a `RefCell` borrow alive across a call
//! that may re-enter the lock.
//!
//! # Example
//!
//! ```
//! use quell_async::sync::reentrant::Lock;
//! use std::cell::RefCell;
//!
//! let lock = Lock::new(RefCell::new(Vec::new()));
//!
//! lock.with_lock(|outer| {
//!     outer.borrow_mut().push(1);
//!     // Same thread, no deadlock
//!     lock.with_lock(|inner| inner.borrow_mut().push(2));
//! });
//!
//! assert_eq!(*lock.lock().borrow(), vec![1, 2]);
//! ```

pub use parking_lot::ReentrantMutexGuard as LockGuard;

/// A blocking re-entrant mutex.
///
/// Thin wrapper around `parking_lot::ReentrantMutex`. Releasing happens when
/// the guard is dropped, so every exit path (return, `?`, unwinding) releases
/// exactly the acquisitions it made.
#[derive(Debug, Default)]
pub struct Lock<T>(parking_lot::ReentrantMutex<T>);

impl<T> Lock<T> {
    /// Creates a new unlocked `Lock`.
    #[inline]
    pub fn new(value: T) -> Self {
        Self(parking_lot::ReentrantMutex::new(value))
    }

    /// Acquires the lock, blocking while another thread holds it.
    ///
    /// Returns immediately if the current thread already holds it.
    #[inline]
    pub fn lock(&self) -> LockGuard<'_, T> {
        self.0.lock()
    }

    /// Attempts to acquire the lock without blocking.
    #[inline]
    pub fn try_lock(&self) -> Option<LockGuard<'_, T>> {
        self.0.try_lock()
    }

    /// Runs `body` with the lock held and releases it afterwards, including
    /// when `body` panics.
    #[inline]
    pub fn with_lock<R>(&self, body: impl FnOnce(&T) -> R) -> R {
        let guard = self.0.lock();
        body(&guard)
    }

    /// Returns `true` if any thread currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.0.is_locked()
    }

    /// Consumes the lock and returns the inner value.
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
