use super::*;
use core::{
    pin::Pin,
    task::{Context, Poll, Waker},
};
use futures::Stream;
use quell_async::sync::spin::Mutex;
use std::collections::VecDeque;

enum Terminal<E> {
    Completed,
    Failed(Option<E>),
    Cancelled,
}

struct BufferState<T, E> {
    // True until the consumer first polls; never set back
    caching: bool,
    buffer: VecDeque<T>,
    live: VecDeque<T>,
    terminal: Option<Terminal<E>>,
    waker: Option<Waker>,
}

/// Hand-off point between a producer pump and its consumer.
///
/// Values pushed before the consumer attaches are cached and replayed ahead
/// of anything pushed later. The first terminal transition wins: a late
/// completion cannot override a cancellation and vice versa.
pub(crate) struct Relay<T, E> {
    state: Mutex<BufferState<T, E>>,
}

impl<T, E> Relay<T, E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BufferState {
                caching: true,
                buffer: VecDeque::with_capacity(capacity),
                live: VecDeque::new(),
                terminal: None,
                waker: None,
            }),
        }
    }

    /// Queues a value, discarding it if the relay has already terminated.
    pub fn push(&self, value: T) {
        let waker = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            if state.caching {
                state.buffer.push_back(value);
            } else {
                state.live.push_back(value);
            }
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake()
        }
    }

    pub fn complete(&self) -> bool {
        self.terminate(Terminal::Completed)
    }

    pub fn fail(&self, error: E) -> bool {
        self.terminate(Terminal::Failed(Some(error)))
    }

    /// Terminates the relay and discards anything not yet delivered.
    ///
    /// Returns `false` if the relay had already completed or failed, in which
    /// case the pending values are kept for the consumer.
    pub fn cancel(&self) -> bool {
        let (waker, _discarded) = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return false;
            }
            state.terminal = Some(Terminal::Cancelled);
            (
                state.waker.take(),
                (
                    core::mem::take(&mut state.buffer),
                    core::mem::take(&mut state.live),
                ),
            )
        };

        if let Some(waker) = waker {
            waker.wake()
        }
        true
    }

    fn terminate(&self, terminal: Terminal<E>) -> bool {
        let waker = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return false;
            }
            state.terminal = Some(terminal);
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake()
        }
        true
    }

    #[cfg(test)]
    pub fn is_caching(&self) -> bool {
        self.state.lock().caching
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state.lock().terminal, Some(Terminal::Cancelled))
    }

    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.buffer.len() + state.live.len()
    }
}

/// The consumer side of a cancellable subscription.
///
/// Yields the values cached before the first poll, in order, then live
/// values as the producer delivers them. An upstream error is yielded after
/// all preceding values and ends the stream. Cancellation ends the stream
/// without a final item; [`is_cancelled`](Replay::is_cancelled) tells the two
/// endings apart.
///
/// Dropping a `Replay` disposes its subscription.
pub struct Replay<T, E> {
    relay: Arc<Relay<T, E>>,
    handle: DisposalHandle,
    finished: bool,
}

impl<T, E> Replay<T, E> {
    pub(crate) fn new(relay: Arc<Relay<T, E>>, handle: DisposalHandle) -> Self {
        Self {
            relay,
            handle,
            finished: false,
        }
    }

    /// `true` if the subscription ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.relay.is_cancelled()
    }

    /// Number of values received but not yet yielded.
    pub fn buffered(&self) -> usize {
        self.relay.pending()
    }

    /// The handle that disposes this subscription.
    pub fn handle(&self) -> &DisposalHandle {
        &self.handle
    }
}

impl<T, E> Stream for Replay<T, E> {
    type Item = core::result::Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        let mut state = this.relay.state.lock();
        state.caching = false;

        if let Some(Terminal::Cancelled) = state.terminal {
            this.finished = true;
            return Poll::Ready(None);
        }

        if let Some(value) = state.buffer.pop_front() {
            return Poll::Ready(Some(Ok(value)));
        }
        if let Some(value) = state.live.pop_front() {
            return Poll::Ready(Some(Ok(value)));
        }

        if let Some(Terminal::Failed(error)) = &mut state.terminal {
            let error = error.take();
            this.finished = true;
            return Poll::Ready(error.map(Err));
        }
        if state.terminal.is_some() {
            this.finished = true;
            return Poll::Ready(None);
        }

        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T, E> Drop for Replay<T, E> {
    fn drop(&mut self) {
        self.handle.dispose()
    }
}

impl<T, E> core::fmt::Debug for Replay<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Replay")
            .field("buffered", &self.buffered())
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.finished)
            .finish()
    }
}
