//! A minimal effect stream.
//!
//! [`Effect`] is a boxed, `Send` stream of `Result<T, E>` that does nothing
//! until first polled. It carries just enough combinators to build and
//! compose cancellable work; anything else is available through
//! [`futures::StreamExt`], since an effect is itself a stream.
//!
//! Errors are terminal by convention: combinators here stop after the first
//! error, and cancellable subscriptions end after delivering it.

use super::*;
use core::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicBool, Ordering},
    task::{Context, Poll},
};
use futures::{
    Stream, StreamExt,
    future,
    stream::{self, BoxStream},
};

/// A lazily started stream of effect output.
pub struct Effect<T, E = Error> {
    stream: BoxStream<'static, core::result::Result<T, E>>,
}

impl<T, E> Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = core::result::Result<T, E>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Emits each value of `values` in order, then completes.
    pub fn sequence<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(stream::iter(values).map(Ok))
    }

    pub fn just(value: T) -> Self {
        Self::from_stream(stream::once(future::ready(Ok(value))))
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    pub fn fail(error: E) -> Self {
        Self::from_stream(stream::once(future::ready(Err(error))))
    }

    /// Emits the output of `future` once it resolves.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = core::result::Result<T, E>> + Send + 'static,
    {
        Self::from_stream(stream::once(future))
    }

    /// Defers building the effect until it is first polled.
    ///
    /// `factory` runs at most once, on the polling thread, and never if the
    /// effect is dropped unpolled.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::from_stream(stream::once(future::lazy(move |_| factory())).flatten())
    }

    /// Runs `work` when first polled and completes without emitting.
    pub fn fire_and_forget<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::from_stream(
            stream::once(future::lazy(move |_| work()))
                .filter_map(|()| future::ready(None::<core::result::Result<T, E>>)),
        )
    }

    /// Emits `value` after `delay`. Zero or negative delays emit on the
    /// first poll.
    pub fn timer(delay: time::Duration, value: T) -> Self {
        Self::future(async move {
            quell_async::time::sleep(delay).await;
            Ok(value)
        })
    }

    pub fn map<U, F>(self, mut f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Effect::from_stream(until_error(self.stream).map(move |r| r.map(&mut f)))
    }

    pub fn map_err<G, F>(self, mut f: F) -> Effect<T, G>
    where
        G: Send + 'static,
        F: FnMut(E) -> G + Send + 'static,
    {
        Effect::from_stream(until_error(self.stream).map(move |r| r.map_err(&mut f)))
    }

    /// Runs the effect returned by `f` for each value, one after another.
    ///
    /// An error from this effect or from any inner effect ends the output.
    pub fn flat_map<U, F>(self, mut f: F) -> Effect<U, E>
    where
        U: Send + 'static,
        F: FnMut(T) -> Effect<U, E> + Send + 'static,
    {
        Effect::from_stream(until_error(
            until_error(self.stream)
                .flat_map(move |r| match r {
                    Ok(value) => f(value),
                    Err(error) => Effect::fail(error),
                })
                .boxed(),
        ))
    }

    /// Runs `next` after this effect completes.
    ///
    /// `next` is not polled, and so not started, if this effect fails.
    pub fn concat(self, next: Self) -> Self {
        let failed = Arc::new(AtomicBool::new(false));
        let flag = failed.clone();
        Self::from_stream(
            until_error(self.stream)
                .inspect(move |r| {
                    if r.is_err() {
                        flag.store(true, Ordering::Relaxed)
                    }
                })
                .chain(Self::deferred(move || {
                    if failed.load(Ordering::Relaxed) {
                        Self::empty()
                    } else {
                        next
                    }
                })),
        )
    }

    /// Drops every value, keeping only the side effects.
    ///
    /// An error ends the effect quietly: it is swallowed and the upstream is
    /// not polled again.
    pub fn ignore_output<U, G>(self) -> Effect<U, G>
    where
        U: Send + 'static,
        G: Send + 'static,
    {
        Effect::from_stream(
            until_error(self.stream)
                .filter_map(|_| future::ready(None::<core::result::Result<U, G>>)),
        )
    }

    /// Attaches side-effect hooks to the effect's lifecycle.
    pub fn handle_events(self, events: EffectEvents<T, E>) -> Self {
        Self::from_stream(Events {
            stream: self.stream,
            events,
            subscribed: false,
            terminated: false,
        })
    }
}

// Ends the stream right after its first error
fn until_error<T, E>(
    stream: BoxStream<'static, core::result::Result<T, E>>,
) -> impl Stream<Item = core::result::Result<T, E>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream::unfold(Some(stream), |stream| async move {
        let mut stream = stream?;
        match stream.next().await? {
            Ok(value) => Some((Ok(value), Some(stream))),
            Err(error) => Some((Err(error), None)),
        }
    })
}

impl<T, E> Stream for Effect<T, E> {
    type Item = core::result::Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<T, E> From<Replay<T, E>> for Effect<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn from(replay: Replay<T, E>) -> Self {
        Self::from_stream(replay)
    }
}

impl<T, E> core::fmt::Debug for Effect<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Effect").finish_non_exhaustive()
    }
}

type Hook = Box<dyn FnMut() + Send>;
type RefHook<V> = Box<dyn FnMut(&V) + Send>;

/// Side-effect hooks for [`Effect::handle_events`].
///
/// - `subscribed`: before the first poll reaches the upstream
/// - `next` / `error`: for each value or error, before it is yielded
/// - `completed`: when the upstream ends without error
/// - `disposed`: when the effect is dropped after subscribing but before
///   it completed or failed
pub struct EffectEvents<T, E> {
    subscribed: Option<Hook>,
    next: Option<RefHook<T>>,
    error: Option<RefHook<E>>,
    completed: Option<Hook>,
    disposed: Option<Hook>,
}

impl<T, E> Default for EffectEvents<T, E> {
    fn default() -> Self {
        Self {
            subscribed: None,
            next: None,
            error: None,
            completed: None,
            disposed: None,
        }
    }
}

impl<T, E> EffectEvents<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_subscribed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.subscribed = Some(Box::new(f));
        self
    }

    pub fn on_next(mut self, f: impl FnMut(&T) + Send + 'static) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&E) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_completed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }

    pub fn on_disposed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.disposed = Some(Box::new(f));
        self
    }
}

struct Events<T, E> {
    stream: BoxStream<'static, core::result::Result<T, E>>,
    events: EffectEvents<T, E>,
    subscribed: bool,
    terminated: bool,
}

impl<T, E> Stream for Events<T, E> {
    type Item = core::result::Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        if !this.subscribed {
            this.subscribed = true;
            if let Some(f) = &mut this.events.subscribed {
                f()
            }
        }

        let next = futures::ready!(this.stream.poll_next_unpin(cx));
        match &next {
            Some(Ok(value)) => {
                if let Some(f) = &mut this.events.next {
                    f(value)
                }
            }
            Some(Err(error)) => {
                this.terminated = true;
                if let Some(f) = &mut this.events.error {
                    f(error)
                }
            }
            None => {
                this.terminated = true;
                if let Some(f) = &mut this.events.completed {
                    f()
                }
            }
        }
        Poll::Ready(next)
    }
}

impl<T, E> Drop for Events<T, E> {
    fn drop(&mut self) {
        if self.subscribed && !self.terminated {
            if let Some(f) = &mut self.events.disposed {
                f()
            }
        }
    }
}
