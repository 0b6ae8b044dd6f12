use super::*;
use core::sync::atomic::{AtomicBool, Ordering};
use quell_async::sync::spin::Mutex;

type Action = Box<dyn FnOnce() + Send>;

struct Inner {
    disposed: AtomicBool,
    action: Mutex<Option<Action>>,
}

/// A single-use token that stops one running effect instance.
///
/// Clones share the same state: the registry keeps one clone, the running
/// subscription keeps others, and whichever disposes first runs the action.
/// Every later [`dispose`](DisposalHandle::dispose) is a no-op.
#[derive(Clone)]
pub struct DisposalHandle(Arc<Inner>);

impl DisposalHandle {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self(Arc::new(Inner {
            disposed: AtomicBool::new(false),
            action: Mutex::new(Some(Box::new(action))),
        }))
    }

    /// A handle with nothing to do, disposed or not.
    pub fn empty() -> Self {
        Self(Arc::new(Inner {
            disposed: AtomicBool::new(false),
            action: Mutex::new(None),
        }))
    }

    /// Runs the disposal action if no clone of this handle has done so yet.
    ///
    /// The action runs on the calling thread, outside any internal lock, and
    /// has returned by the time this call returns unless another thread won
    /// the race to dispose. The losing call returns at once, possibly while
    /// the winner's action is still running.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let action = self.0.action.lock().take();
        if let Some(action) = action {
            action()
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// `true` if both handles are clones of the same token.
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for DisposalHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DisposalHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes the handle when dropped, including during unwinding.
pub(crate) struct DisposeOnDrop(pub DisposalHandle);

impl Drop for DisposeOnDrop {
    fn drop(&mut self) {
        self.0.dispose()
    }
}
