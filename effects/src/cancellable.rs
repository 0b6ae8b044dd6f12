use super::*;
use disposal::DisposeOnDrop;
use futures::StreamExt;
use quell_async::{CancellationToken, sync::spin::Once};
use replay::Relay;

impl CancellationRegistry {
    /// Starts `effect` now and registers it under `id`.
    ///
    /// The upstream is driven by a pump task on the registry's task pool;
    /// anything it produces before the returned [`Replay`] is first polled
    /// is buffered. When `cancel_in_flight` is set, everything already
    /// registered under `id` is cancelled first, within the same critical
    /// section as the new registration.
    ///
    /// Most callers want the lazy [`Effect::cancellable`] instead.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a tokio runtime.
    #[cfg_attr(feature = "instrument", instrument(skip(self, effect)))]
    pub fn subscribe<T, E>(
        self: &Arc<Self>,
        effect: Effect<T, E>,
        id: impl Into<EffectId> + core::fmt::Debug,
        cancel_in_flight: bool,
    ) -> Replay<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let id = id.into();

        self.with_lock(|| {
            if cancel_in_flight {
                self.cancel(&id);
            }

            if self.tasks.is_cancelled() {
                warn!("Effect {id:?} subscribed after registry shutdown, it will not run");
            }

            let relay = Arc::new(Relay::new(self.config.replay_capacity));
            let token = self.tasks.child_token();
            let key = Arc::new(Once::new());

            let handle = {
                let registry = Arc::downgrade(self);
                let relay = relay.clone();
                let token = token.clone();
                let id = id.clone();
                let key = key.clone();
                DisposalHandle::new(move || {
                    token.cancel();
                    if relay.cancel() {
                        trace!("Effect {id:?} cancelled");
                    }
                    if let Some(registry) = registry.upgrade() {
                        registry.release(&id, &key);
                    }
                })
            };

            key.set(self.register(id.clone(), handle.clone()));

            let pump = Pump {
                relay: relay.clone(),
                token,
                metrics: self.config.metrics,
            };
            let dispose = DisposeOnDrop(handle.clone());
            quell_async::spawn!(self.tasks, "effect_pump", (effect_id = ?id), async move {
                pump.run(effect).await;
                drop(dispose);
            });

            Replay::new(relay, handle)
        })
    }
}

struct Pump<T, E> {
    relay: Arc<Relay<T, E>>,
    token: CancellationToken,
    metrics: bool,
}

impl<T, E> Pump<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(self, mut upstream: Effect<T, E>) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = upstream.next() => match next {
                    Some(Ok(value)) => self.relay.push(value),
                    Some(Err(error)) => {
                        self.relay.fail(error);
                        break;
                    }
                    None => {
                        if self.relay.complete() && self.metrics {
                            metrics::counter!("effects_completed").increment(1);
                        }
                        break;
                    }
                }
            }
        }
    }
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Makes the effect cancellable through `registry` under `id`.
    ///
    /// Nothing happens until the returned effect is first polled; at that
    /// point the effect is registered and started (see
    /// [`CancellationRegistry::subscribe`]). Dropping the returned effect or
    /// cancelling `id` stops it. Cancellation is silent: the stream simply
    /// ends.
    ///
    /// With `cancel_in_flight`, any effects already running under `id` are
    /// cancelled before this one starts.
    pub fn cancellable(
        self,
        id: impl Into<EffectId>,
        cancel_in_flight: bool,
        registry: &Arc<CancellationRegistry>,
    ) -> Self {
        let id = id.into();
        let registry = registry.clone();
        Self::deferred(move || registry.subscribe(self, id, cancel_in_flight).into())
    }

    /// An effect that cancels everything registered under `id` when run.
    ///
    /// Always completes without emitting, whether or not anything was in
    /// flight.
    pub fn cancel(id: impl Into<EffectId>, registry: &Arc<CancellationRegistry>) -> Self {
        let id = id.into();
        let registry = registry.clone();
        Self::fire_and_forget(move || {
            registry.cancel(&id);
        })
    }

    /// Emits `value` once `due` has elapsed, unless `id` is cancelled first.
    pub fn timeout(
        id: impl Into<EffectId>,
        cancel_in_flight: bool,
        due: time::Duration,
        value: T,
        registry: &Arc<CancellationRegistry>,
    ) -> Self {
        Self::timer(due, value).cancellable(id, cancel_in_flight, registry)
    }
}
