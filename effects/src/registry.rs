use super::*;
use core::cell::RefCell;
use hashbrown::HashMap;
use quell_async::{Lock, TaskPool, sync::spin::Once};

type Groups = HashMap<EffectId, DisposableGroup>;

/// Tracks every in-flight cancellable effect by [`EffectId`].
///
/// One registry is shared (via `Arc`) by everything that launches or cancels
/// effects in a runtime. An identifier is present only while at least one
/// handle is registered under it; the entry disappears with its last handle.
///
/// All operations take the registry's re-entrant [`Lock`], so a disposal
/// action triggered by [`cancel`](CancellationRegistry::cancel) can call
/// [`unregister`](CancellationRegistry::unregister) on the same thread.
pub struct CancellationRegistry {
    groups: Lock<RefCell<Groups>>,
    pub(crate) tasks: TaskPool,
    pub(crate) config: Config,
}

impl CancellationRegistry {
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        if config.metrics {
            metrics::describe_counter!(
                "effects_registered",
                metrics::Unit::Count,
                "Total number of effect instances registered for cancellation"
            );
            metrics::describe_counter!(
                "effects_cancelled",
                metrics::Unit::Count,
                "Total number of effect instances disposed by cancellation"
            );
            metrics::describe_counter!(
                "effects_completed",
                metrics::Unit::Count,
                "Total number of cancellable effects whose upstream completed"
            );
        }

        Arc::new(Self {
            groups: Lock::new(RefCell::new(HashMap::with_capacity(
                config.registry_capacity,
            ))),
            tasks: TaskPool::new(),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `body` while holding the registry lock.
    ///
    /// Registry operations called from `body` on the same thread do not
    /// block, and no other thread can register, unregister or cancel until
    /// `body` returns.
    pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
        self.groups.with_lock(|_| body())
    }

    /// Adds `handle` to the group for `id`, creating the group if needed.
    pub fn register(&self, id: EffectId, handle: DisposalHandle) -> RemovalKey {
        let key = self.groups.with_lock(|groups| {
            groups
                .borrow_mut()
                .entry(id.clone())
                .or_default()
                .insert(handle)
        });

        trace!("Registered effect {id:?} with key {}", key.get());

        if self.config.metrics {
            metrics::counter!("effects_registered").increment(1);
        }
        key
    }

    /// Removes the handle for `key` from `id`'s group without disposing it,
    /// deleting the group when it becomes empty.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn unregister(&self, id: &EffectId, key: RemovalKey) -> bool {
        let removed = self.groups.with_lock(|groups| {
            let mut groups = groups.borrow_mut();
            let group = groups.get_mut(id)?;
            let handle = group.remove(key);
            if group.is_empty() {
                groups.remove(id);
            }
            handle
        });

        // Dropped outside the borrow: the last clone of a handle owns its
        // action, and with it arbitrary captured state
        match removed {
            Some(_) => {
                trace!("Unregistered effect {id:?} with key {}", key.get());
                true
            }
            None => {
                trace!("Effect {id:?} key {} already unregistered", key.get());
                false
            }
        }
    }

    /// Disposes every handle registered under `id`.
    ///
    /// Returns the number of handles disposed; cancelling an identifier with
    /// nothing in flight does nothing and returns 0. By the time this returns
    /// every disposal action has been invoked. A handle that another thread
    /// was already disposing is counted, but its action may still be running
    /// on that thread.
    #[cfg_attr(feature = "instrument", instrument(skip(self)))]
    pub fn cancel(&self, id: &EffectId) -> usize {
        self.groups.with_lock(|groups| {
            let group = groups.borrow_mut().remove(id);
            let Some(group) = group else {
                trace!("Nothing in flight for {id:?}");
                return 0;
            };

            let count = group.into_detached().dispose();
            debug!("Cancelled {count} in-flight effect(s) for {id:?}");

            if self.config.metrics {
                metrics::counter!("effects_cancelled").increment(count as u64);
            }
            count
        })
    }

    /// Disposes every registered handle under every identifier.
    #[cfg_attr(feature = "instrument", instrument(skip(self)))]
    pub fn cancel_all(&self) -> usize {
        self.groups.with_lock(|groups| {
            let all = core::mem::take(&mut *groups.borrow_mut());
            let count = all
                .into_values()
                .map(|group| group.into_detached().dispose())
                .sum::<usize>();

            if count > 0 {
                debug!("Cancelled {count} in-flight effect(s)");
                if self.config.metrics {
                    metrics::counter!("effects_cancelled").increment(count as u64);
                }
            }
            count
        })
    }

    /// Cancels everything and waits for all producer pumps to return.
    ///
    /// Effects subscribed afterwards end immediately without producing.
    pub async fn shutdown(&self) {
        debug!("Shutting down effect registry");
        self.cancel_all();
        self.tasks.shutdown().await;
    }

    /// Number of handles currently registered under `id`.
    pub fn in_flight(&self, id: &EffectId) -> usize {
        self.groups
            .with_lock(|groups| groups.borrow().get(id).map_or(0, DisposableGroup::count))
    }

    pub fn contains(&self, id: &EffectId) -> bool {
        self.groups
            .with_lock(|groups| groups.borrow().contains_key(id))
    }

    /// Number of identifiers with at least one effect in flight.
    pub fn len(&self) -> usize {
        self.groups.with_lock(|groups| groups.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregisters a handle whose key is published through `key` once
    /// registration has finished.
    pub(crate) fn release(&self, id: &EffectId, key: &Once<RemovalKey>) {
        self.with_lock(|| match key.get() {
            Some(key) => {
                self.unregister(id, *key);
            }
            None => {
                error!("Effect {id:?} was disposed before its handle was registered");
                debug_assert!(
                    false,
                    "Effect {id:?} was disposed before its handle was registered"
                );
            }
        })
    }
}

impl Drop for CancellationRegistry {
    fn drop(&mut self) {
        self.cancel_all();
        self.tasks.cancel_token().cancel();
    }
}

impl core::fmt::Debug for CancellationRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CancellationRegistry")
            .field("ids", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
