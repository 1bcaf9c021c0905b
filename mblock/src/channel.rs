//! Multiple-producer single-consumer channel feeding the inbound queue of a
//! block.

mod queue;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_event::Event;
use diatomic_waker::primitives::DiatomicWaker;

use queue::{PopError, PushError, Queue};

/// Data shared between the receiver and the senders.
struct Inner<T> {
    /// Non-blocking internal queue.
    queue: Queue<T>,
    /// Signalling primitive used to notify the receiver.
    receiver_signal: DiatomicWaker,
    /// Signalling primitive used to notify one or several senders.
    sender_signal: Event,
}

impl<T> Inner<T> {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Queue::new(capacity),
            receiver_signal: DiatomicWaker::new(),
            sender_signal: Event::new(),
        }
    }
}

/// The consumer side of the channel.
pub(crate) struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Receiver<T> {
    /// Creates a new receiver with the specified capacity.
    ///
    /// # Panic
    ///
    /// The constructor will panic if the requested capacity is 0 or is greater
    /// than `usize::MAX/2 + 1`.
    pub(crate) fn new(capacity: usize) -> Self {
        Receiver {
            inner: Arc::new(Inner::new(capacity)),
        }
    }

    /// Creates a new sender.
    pub(crate) fn sender(&self) -> Sender<T> {
        Sender {
            inner: self.inner.clone(),
        }
    }

    /// Receives an item, if necessary waiting until one becomes available.
    ///
    /// Dropping the returned future before completion cancels the wait without
    /// losing any item.
    pub(crate) async fn recv(&mut self) -> Result<T, RecvError> {
        // Safety: `recv` takes `&mut self` and the receiver is not `Clone`, so
        // the queue is only ever popped and the waker only ever registered
        // from a single context.
        let item = unsafe {
            self.inner
                .receiver_signal
                .wait_until(|| match self.inner.queue.pop() {
                    Ok(item) => Some(Some(item)),
                    Err(PopError::Empty) => None,
                    Err(PopError::Closed) => Some(None),
                })
                .await
        };

        match item {
            Some(item) => {
                // A slot was freed: let one awaiting sender retry.
                self.inner.sender_signal.notify_one();

                Ok(item)
            }
            None => Err(RecvError),
        }
    }

    /// Attempts to receive an item without waiting.
    pub(crate) fn try_recv(&mut self) -> Result<T, TryRecvError> {
        // Safety: see `recv`.
        match unsafe { self.inner.queue.pop() } {
            Ok(item) => {
                self.inner.sender_signal.notify_one();

                Ok(item)
            }
            Err(PopError::Empty) => Err(TryRecvError::Empty),
            Err(PopError::Closed) => Err(TryRecvError::Closed),
        }
    }

    /// Closes the channel.
    ///
    /// Items that were already sent can still be received, so this should
    /// typically be followed by a loop receiving all remaining items.
    pub(crate) fn close(&self) {
        if !self.inner.queue.is_closed() {
            self.inner.queue.close();

            // Notify all blocked senders that the channel is closed.
            self.inner.sender_signal.notify_all();
        }
    }

    /// Returns the number of items currently in the channel.
    pub(crate) fn len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Returns the capacity of the channel.
    pub(crate) fn capacity(&self) -> usize {
        self.inner.queue.capacity()
    }

    /// Returns a unique identifier for the channel.
    ///
    /// All channels are guaranteed to have different identifiers at any given
    /// time, but an identifier may be reused after all handles to a channel
    /// have been dropped.
    pub(crate) fn channel_id(&self) -> ChannelId {
        ChannelId::of(&self.inner)
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.inner.queue.close();

        // Notify all blocked senders that the channel is closed.
        self.inner.sender_signal.notify_all();
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

/// A handle to a channel that can send items.
pub(crate) struct Sender<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> Sender<T> {
    /// Attempts to send an item without waiting.
    ///
    /// The item is handed back if the channel is full or closed.
    pub(crate) fn try_send(&self, item: T) -> Result<(), SendError<T>> {
        match self.inner.queue.push(item) {
            Ok(()) => {
                self.inner.receiver_signal.notify();

                Ok(())
            }
            Err(PushError::Full(item)) => Err(SendError::Full(item)),
            Err(PushError::Closed(item)) => Err(SendError::Closed(item)),
        }
    }

    /// Sends an item, if necessary waiting until enough capacity becomes
    /// available in the channel.
    ///
    /// The item is handed back if the channel is closed. Dropping the returned
    /// future before completion cancels the send.
    pub(crate) async fn send(&self, item: T) -> Result<(), T> {
        let mut item = Some(item);

        let outcome = self
            .inner
            .sender_signal
            .wait_until(|| {
                let Some(candidate) = item.take() else {
                    unreachable!()
                };
                match self.inner.queue.push(candidate) {
                    Ok(()) => Some(Ok(())),
                    Err(PushError::Full(candidate)) => {
                        item = Some(candidate);

                        None
                    }
                    Err(PushError::Closed(candidate)) => Some(Err(candidate)),
                }
            })
            .await;

        if outcome.is_ok() {
            self.inner.receiver_signal.notify();
        }

        outcome
    }

    /// Checks if the channel is closed.
    pub(crate) fn is_closed(&self) -> bool {
        self.inner.queue.is_closed()
    }

    /// Returns a unique identifier for the channel.
    pub(crate) fn channel_id(&self) -> ChannelId {
        ChannelId::of(&self.inner)
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// Unique identifier for a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ChannelId(NonZeroUsize);

impl ChannelId {
    fn of<T>(inner: &Arc<Inner<T>>) -> Self {
        // The address of the shared data is never null.
        match NonZeroUsize::new(Arc::as_ptr(inner) as usize) {
            Some(id) => ChannelId(id),
            None => unreachable!(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An error returned when an item could not be sent without waiting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SendError<T> {
    /// The channel is at capacity.
    Full(T),
    /// The channel was closed.
    Closed(T),
}

/// An error returned when an item could not be received without waiting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TryRecvError {
    /// No item is available.
    Empty,
    /// The channel was closed and all items were received.
    Closed,
}

/// An error returned when the channel was closed and all items were received.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct RecvError;
