use super::*;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;

// Keys are unique across every group, so a stale key can never match a
// handle inserted later under the same identifier
static NEXT_KEY: AtomicU64 = AtomicU64::new(0);

/// Identifies one handle inside a [`DisposableGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemovalKey(u64);

impl RemovalKey {
    fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// An insertion-ordered set of [`DisposalHandle`]s.
#[derive(Debug, Default)]
pub struct DisposableGroup {
    handles: BTreeMap<RemovalKey, DisposalHandle>,
}

impl DisposableGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: DisposalHandle) -> RemovalKey {
        let key = RemovalKey::next();
        self.handles.insert(key, handle);
        key
    }

    /// Removes the handle for `key` without disposing it.
    ///
    /// Unknown keys are ignored.
    pub fn remove(&mut self, key: RemovalKey) -> Option<DisposalHandle> {
        self.handles.remove(&key)
    }

    /// Disposes every handle, in insertion order, leaving the group empty.
    ///
    /// The members are detached before any of them is disposed, so a handle
    /// whose action removes itself from this group finds nothing to remove.
    pub fn dispose_all(&mut self) -> usize {
        Detached(core::mem::take(&mut self.handles)).dispose()
    }

    /// Moves every handle out, leaving the group empty.
    pub(crate) fn into_detached(self) -> Detached {
        Detached(self.handles)
    }

    pub fn contains(&self, key: RemovalKey) -> bool {
        self.handles.contains_key(&key)
    }

    #[cfg(test)]
    pub(crate) fn handles(&self) -> impl Iterator<Item = &DisposalHandle> + '_ {
        self.handles.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = RemovalKey> + '_ {
        self.handles.keys().copied()
    }

    pub fn count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Handles taken out of a group, waiting to be disposed.
pub(crate) struct Detached(BTreeMap<RemovalKey, DisposalHandle>);

impl Detached {
    pub fn dispose(self) -> usize {
        let count = self.0.len();
        for handle in self.0.into_values() {
            handle.dispose();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quell_async::sync::spin::Mutex;

    #[test]
    fn insert_remove() {
        let mut group = DisposableGroup::new();
        let a = group.insert(DisposalHandle::empty());
        let b = group.insert(DisposalHandle::empty());
        assert_ne!(a, b);
        assert_eq!(group.count(), 2);
        assert_eq!(group.keys().collect::<Vec<_>>(), vec![a, b]);

        assert!(group.remove(a).is_some());
        assert!(group.remove(a).is_none());
        assert!(!group.contains(a));
        assert!(group.contains(b));
        assert_eq!(group.count(), 1);

        group.remove(b);
        assert!(group.is_empty());
    }

    #[test]
    fn keys_are_unique_across_groups() {
        let mut first = DisposableGroup::new();
        let mut second = DisposableGroup::new();
        let a = first.insert(DisposalHandle::empty());
        let b = second.insert(DisposalHandle::empty());
        assert_ne!(a, b);
        assert!(second.remove(a).is_none());
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn dispose_all_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut group = DisposableGroup::new();
        for i in 0..4 {
            let order = order.clone();
            group.insert(DisposalHandle::new(move || order.lock().push(i)));
        }

        assert_eq!(group.dispose_all(), 4);
        assert!(group.is_empty());
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);

        assert_eq!(group.dispose_all(), 0);
    }

    #[test]
    fn self_removal_during_dispose_all() {
        let group = Arc::new(Mutex::new(DisposableGroup::new()));
        let disposed = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let key_slot = Arc::new(quell_async::sync::spin::Once::new());
            let handle = {
                let group = group.clone();
                let key_slot = key_slot.clone();
                let disposed = disposed.clone();
                DisposalHandle::new(move || {
                    disposed.lock().push(i);
                    if let Some(key) = key_slot.get() {
                        group.lock().remove(*key);
                    }
                })
            };
            key_slot.set(group.lock().insert(handle));
        }

        // Detach under the lock, dispose outside it
        let detached = core::mem::take(&mut *group.lock()).into_detached();
        assert_eq!(detached.dispose(), 3);

        assert!(group.lock().is_empty());
        assert_eq!(*disposed.lock(), vec![0, 1, 2]);
    }
}
