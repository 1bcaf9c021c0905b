//! Inbound message queue of a block and the accepter handles feeding it.
//!
//! Each [`Block`](crate::block::Block) owns exactly one [`Inbox`], a bounded
//! multiple-producer single-consumer queue collecting the messages delivered
//! to any of its ports. Producers reach an inbox through [`Accepter`]s
//! obtained with [`Block::make_accepter()`](crate::block::Block::make_accepter):
//! an accepter is bound to one port and tags every message it pushes with that
//! port's name.
//!
//! The consumer side belongs to whatever runs the block's message loop. It can
//! wait for work asynchronously with [`Inbox::recv()`], poll with
//! [`Inbox::try_recv()`] or block the calling thread with
//! [`Inbox::recv_timeout()`].
//!
//! Messages pushed by a single accepter are received in the order in which
//! they were pushed. No ordering is guaranteed between distinct producers.

use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::channel::{self, Receiver, Sender};
use crate::message::{Delivery, Message};

/// The inbound message queue of a block.
pub struct Inbox(Receiver<Delivery>);

impl Inbox {
    /// Default capacity when created with `new` or `Default::default`.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Creates a new inbox with capacity `Self::DEFAULT_CAPACITY`.
    pub fn new() -> Self {
        Self(Receiver::new(Self::DEFAULT_CAPACITY))
    }

    /// Creates a new inbox with the specified capacity.
    ///
    /// # Panic
    ///
    /// The constructor will panic if the requested capacity is 0 or is greater
    /// than `usize::MAX/2 + 1`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Receiver::new(capacity))
    }

    /// Returns an accepter pushing to this inbox on behalf of `port_name`.
    pub(crate) fn accepter(&self, port_name: Arc<str>) -> Accepter {
        Accepter {
            sender: self.0.sender(),
            port_name,
        }
    }

    /// Receives a delivery, waiting until one becomes available.
    ///
    /// An error is returned once the inbox is closed and drained. Dropping the
    /// future before completion cancels the wait without losing messages.
    pub async fn recv(&mut self) -> Result<Delivery, RecvError> {
        self.0.recv().await.map_err(|channel::RecvError| RecvError)
    }

    /// Receives a delivery if one is immediately available.
    pub fn try_recv(&mut self) -> Result<Delivery, TryRecvError> {
        self.0.try_recv().map_err(|e| match e {
            channel::TryRecvError::Empty => TryRecvError::Empty,
            channel::TryRecvError::Closed => TryRecvError::Closed,
        })
    }

    /// Receives a delivery, blocking the current thread until one becomes
    /// available or until the timeout, if any, elapses.
    ///
    /// A timeout too large to be represented as a deadline is treated as no
    /// timeout.
    pub fn recv_timeout(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Delivery, RecvTimeoutError> {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        let (parker, unparker) = parking::pair();
        let waker = Waker::from(unparker);
        let mut cx = Context::from_waker(&waker);

        let mut recv = pin!(self.recv());
        loop {
            if let Poll::Ready(delivery) = recv.as_mut().poll(&mut cx) {
                return delivery.map_err(|RecvError| RecvTimeoutError::Closed);
            }
            match deadline {
                Some(deadline) => {
                    if !parker.park_deadline(deadline) {
                        return Err(RecvTimeoutError::Timeout);
                    }
                }
                None => parker.park(),
            }
        }
    }

    /// Closes the inbox.
    ///
    /// Further pushes are rejected. Messages that were already accepted can
    /// still be received, which is why a call to this method should typically
    /// be followed by a loop draining the inbox.
    pub fn close(&self) {
        self.0.close();
    }

    /// Returns the number of queued deliveries.
    ///
    /// The value is only exact in the absence of concurrent pushes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the inbox is empty.
    ///
    /// The value is only exact in the absence of concurrent pushes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity of the inbox.
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Inbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("inbox_id", &self.0.channel_id().to_string())
            .finish_non_exhaustive()
    }
}

/// Handle pushing messages to a block's inbox on behalf of one of its ports.
///
/// An accepter can be cloned and shared between threads.
#[derive(Clone)]
pub struct Accepter {
    sender: Sender<Delivery>,
    port_name: Arc<str>,
}

impl Accepter {
    /// Returns the name of the port this accepter is bound to.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Pushes a message without waiting.
    ///
    /// The message is handed back in the error if the inbox is full or closed.
    pub fn accept(&self, message: Message) -> Result<(), AcceptError> {
        let delivery = Delivery {
            port_name: self.port_name.clone(),
            message,
        };

        self.sender.try_send(delivery).map_err(|e| match e {
            channel::SendError::Full(delivery) => AcceptError::Full(delivery.message),
            channel::SendError::Closed(delivery) => AcceptError::Closed(delivery.message),
        })
    }

    /// Pushes a message, if necessary waiting until the inbox has capacity.
    ///
    /// The message is handed back in the error if the inbox is closed.
    /// Dropping the future before completion cancels the push.
    pub async fn send(&self, message: Message) -> Result<(), AcceptError> {
        let delivery = Delivery {
            port_name: self.port_name.clone(),
            message,
        };

        self.sender
            .send(delivery)
            .await
            .map_err(|delivery| AcceptError::Closed(delivery.message))
    }

    /// Checks whether the inbox was closed.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for Accepter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accepter")
            .field("inbox_id", &self.sender.channel_id().to_string())
            .field("port_name", &self.port_name)
            .finish()
    }
}

/// Error returned when a message could not be pushed to an inbox.
///
/// The rejected message is handed back to the caller.
#[derive(Debug, Error)]
pub enum AcceptError {
    /// The inbox is at capacity.
    #[error("inbox is full")]
    Full(Message),
    /// The inbox was closed.
    #[error("inbox is closed")]
    Closed(Message),
}

impl AcceptError {
    /// Recovers the rejected message.
    pub fn into_message(self) -> Message {
        match self {
            Self::Full(message) | Self::Closed(message) => message,
        }
    }
}

/// Error returned when receiving from a closed and drained inbox.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("receiving from a closed inbox")]
pub struct RecvError;

/// Error returned by [`Inbox::try_recv()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TryRecvError {
    /// No delivery is queued.
    #[error("inbox is empty")]
    Empty,
    /// The inbox was closed and drained.
    #[error("receiving from a closed inbox")]
    Closed,
}

/// Error returned by [`Inbox::recv_timeout()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RecvTimeoutError {
    /// No delivery arrived before the timeout elapsed.
    #[error("timed out waiting for a delivery")]
    Timeout,
    /// The inbox was closed and drained.
    #[error("receiving from a closed inbox")]
    Closed,
}
