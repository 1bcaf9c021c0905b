//! A bounded MPSC queue, based on Dmitry Vyukov's MPMC queue.
//!
//! Items are moved in and out of the queue by value; the consumer side must be
//! confined to a single thread.

use std::cmp;
use std::fmt;
use std::sync::atomic::Ordering;

use crossbeam_utils::CachePadded;

use crate::loom_exports::cell::UnsafeCell;
use crate::loom_exports::debug_or_loom_assert_eq;
use crate::loom_exports::sync::atomic::AtomicUsize;

/// A queue slot with a stamp and an optional item.
struct Slot<T> {
    stamp: AtomicUsize,
    item: UnsafeCell<Option<T>>,
}

/// A fast, bounded MPSC queue.
///
/// The enqueue position, dequeue position and the slot stamps are all stored as
/// `usize` and share the following layout:
///
/// ```text
///
/// | <- MSB                                LSB -> |
/// | Sequence count | flag (1 bit) | Buffer index |
///
/// ```
///
/// The purpose of the flag differs depending on the field:
///
/// - enqueue position: if set, the flag signals that the queue has been closed
///   by either the consumer or a producer,
/// - dequeue position: the flag is not used (always 0),
/// - slot stamp: the flag de-facto extends the mantissa of the buffer index,
///   which makes it in particular possible to support queues with a capacity of
///   1 without special-casing.
pub(super) struct Queue<T> {
    /// Buffer position of the slot to which the next item will be written.
    enqueue_pos: CachePadded<AtomicUsize>,

    /// Buffer position of the slot from which the next item will be read.
    ///
    /// Only ever mutated by the consumer, but shared with the producers so that
    /// `len` can be computed from any handle.
    dequeue_pos: CachePadded<AtomicUsize>,

    /// Buffer holding the items and their stamps.
    buffer: Box<[Slot<T>]>,

    /// Bit mask covering both the buffer index and the 1-bit flag.
    right_mask: usize,

    /// Bit mask for the 1-bit flag, used as closed-channel flag in the enqueue
    /// position.
    closed_channel_mask: usize,
}

impl<T> Queue<T> {
    /// Creates a new queue with the specified capacity.
    ///
    /// # Panic
    ///
    /// Panics if the capacity is 0 or greater than `usize::MAX/2 + 1`.
    pub(super) fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "the capacity must be 1 or greater");

        assert!(
            capacity <= (1 << (usize::BITS - 1)),
            "the capacity may not exceed {}",
            1usize << (usize::BITS - 1)
        );

        // Allocate a buffer initialized with linearly increasing stamps.
        let mut buffer = Vec::with_capacity(capacity);
        for i in 0..capacity {
            buffer.push(Slot {
                stamp: AtomicUsize::new(i),
                item: UnsafeCell::new(None),
            });
        }

        let closed_channel_mask = capacity.next_power_of_two();
        let right_mask = (closed_channel_mask << 1).wrapping_sub(1);

        Queue {
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
            buffer: buffer.into(),
            right_mask,
            closed_channel_mask,
        }
    }

    /// Attempts to push an item in the queue.
    ///
    /// The item is handed back in the error if the queue is full or closed.
    pub(super) fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut enqueue_pos = self.enqueue_pos.load(Ordering::Relaxed);

        loop {
            if enqueue_pos & self.closed_channel_mask != 0 {
                return Err(PushError::Closed(item));
            }

            let slot = &self.buffer[enqueue_pos & self.right_mask];
            let stamp = slot.stamp.load(Ordering::Acquire);

            let stamp_delta = stamp.wrapping_sub(enqueue_pos) as isize;

            match stamp_delta.cmp(&0) {
                cmp::Ordering::Equal => {
                    // The enqueue position matches the stamp: a push can be
                    // attempted.
                    match self.enqueue_pos.compare_exchange_weak(
                        enqueue_pos,
                        self.next_queue_pos(enqueue_pos),
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => {
                            // Safety: the slot was reserved by the successful
                            // CAS and cannot be accessed by the consumer until
                            // its stamp is updated.
                            slot.item.with_mut(|p| unsafe { *p = Some(item) });
                            slot.stamp.store(stamp.wrapping_add(1), Ordering::Release);

                            return Ok(());
                        }
                        Err(pos) => {
                            enqueue_pos = pos;
                        }
                    }
                }
                cmp::Ordering::Less => {
                    // The sequence count of the stamp is smaller than that of
                    // the enqueue position: the item it contains has not been
                    // popped yet, so report a full queue.
                    return Err(PushError::Full(item));
                }
                cmp::Ordering::Greater => {
                    // We raced with a concurrent producer which has already
                    // incremented the enqueue position and written to this
                    // slot. A retry is required.
                    enqueue_pos = self.enqueue_pos.load(Ordering::Relaxed);
                }
            }
        }
    }

    /// Attempts to pop an item from the queue.
    ///
    /// # Safety
    ///
    /// This method may not be called concurrently from multiple threads.
    pub(super) unsafe fn pop(&self) -> Result<T, PopError> {
        let dequeue_pos = self.dequeue_pos.load(Ordering::Relaxed);
        let index = dequeue_pos & self.right_mask;
        let slot = &self.buffer[index];
        let stamp = slot.stamp.load(Ordering::Acquire);

        if dequeue_pos != stamp {
            // The stamp is ahead of the dequeue position by 1 increment: the
            // item can be popped.
            debug_or_loom_assert_eq!(stamp, dequeue_pos + 1);

            // Only this thread can modify the dequeue position so there is no
            // need to increment the position atomically with a `fetch_add`.
            self.dequeue_pos
                .store(self.next_queue_pos(dequeue_pos), Ordering::Relaxed);

            let item = slot.item.with_mut(|p| (*p).take());

            // Hand the slot back to the producers, one sequence increment
            // ahead of the dequeue position.
            slot.stamp
                .store(stamp.wrapping_add(self.right_mask), Ordering::Release);

            match item {
                Some(item) => Ok(item),
                None => unreachable!(),
            }
        } else {
            // Even if the closed flag is set and the slot is empty, a producer
            // may have started a push before the channel was closed without
            // having updated the stamp yet, so the enqueue position must match
            // the dequeue position as well.
            //
            // Ordering: Relaxed ordering is enough since no item will be read.
            if self.enqueue_pos.load(Ordering::Relaxed) == (dequeue_pos | self.closed_channel_mask)
            {
                Err(PopError::Closed)
            } else {
                Err(PopError::Empty)
            }
        }
    }

    /// Closes the queue.
    pub(super) fn close(&self) {
        // Ordering: Relaxed ordering is enough here since neither the producers
        // nor the consumer rely on this flag for synchronizing reads and
        // writes.
        self.enqueue_pos
            .fetch_or(self.closed_channel_mask, Ordering::Relaxed);
    }

    /// Checks if the queue has been closed.
    ///
    /// Items may still be present in a closed queue, so further calls to `pop`
    /// may still succeed.
    pub(super) fn is_closed(&self) -> bool {
        self.enqueue_pos.load(Ordering::Relaxed) & self.closed_channel_mask != 0
    }

    /// Returns the number of items in the queue.
    ///
    /// # Warning
    ///
    /// The returned result is only meaningful if there are no concurrent `push`
    /// or `pop` operations. Otherwise, it may neither reflect the current nor a
    /// past state of the queue, and may be greater than its capacity.
    pub(super) fn len(&self) -> usize {
        let enqueue_pos = self.enqueue_pos.load(Ordering::Relaxed);
        let dequeue_pos = self.dequeue_pos.load(Ordering::Relaxed);
        let enqueue_idx = enqueue_pos & (self.right_mask >> 1);
        let dequeue_idx = dequeue_pos & (self.right_mask >> 1);

        // If the sequence numbers differ, the enqueue position has wrapped
        // around one more time than the dequeue position.
        let carry_flag = (enqueue_pos & !self.right_mask) != (dequeue_pos & !self.right_mask);

        (enqueue_idx + (carry_flag as usize) * self.buffer.len()) - dequeue_idx
    }

    /// Returns the capacity of the queue.
    pub(super) fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Increment the queue position, incrementing the sequence count as well if
    /// the index wraps to 0.
    ///
    /// Precondition when used with enqueue positions: the closed-channel flag
    /// should be cleared.
    #[inline]
    fn next_queue_pos(&self, queue_pos: usize) -> usize {
        debug_or_loom_assert_eq!(queue_pos & self.closed_channel_mask, 0);

        // The queue position cannot wrap around: in the worst case it will
        // overflow the flag bit.
        let new_queue_pos = queue_pos + 1;

        let new_index = new_queue_pos & self.right_mask;

        if new_index < self.buffer.len() {
            new_queue_pos
        } else {
            let sequence_increment = self.right_mask + 1;
            let sequence_count = queue_pos & !self.right_mask;

            sequence_count.wrapping_add(sequence_increment)
        }
    }
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

/// Error occurring when pushing into a queue is unsuccessful.
#[derive(Debug)]
pub(super) enum PushError<T> {
    /// The queue is full.
    Full(T),
    /// The queue has been closed.
    Closed(T),
}

/// Error occurring when popping from a queue is unsuccessful.
#[derive(Debug)]
pub(super) enum PopError {
    /// The queue is empty.
    Empty,
    /// The queue was closed and is empty.
    Closed,
}

/// Queue producer.
///
/// This is a safe queue producer proxy used for testing purposes only.
#[cfg(test)]
struct Producer<T> {
    inner: crate::loom_exports::sync::Arc<Queue<T>>,
}
#[cfg(test)]
impl<T> Producer<T> {
    fn push(&self, item: T) -> Result<(), PushError<T>> {
        self.inner.push(item)
    }

    fn close(&self) {
        self.inner.close();
    }

    #[cfg(not(mblock_loom))]
    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
#[cfg(test)]
impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Queue consumer.
///
/// This is a safe queue consumer proxy used for testing purposes only.
#[cfg(test)]
struct Consumer<T> {
    inner: crate::loom_exports::sync::Arc<Queue<T>>,
}
#[cfg(test)]
impl<T> Consumer<T> {
    fn pop(&mut self) -> Result<T, PopError> {
        // Safety: single-thread access is guaranteed since the consumer does
        // not implement `Clone` and `pop` requires exclusive ownership.
        unsafe { self.inner.pop() }
    }

    fn close(&self) {
        self.inner.close();
    }

    #[cfg(not(mblock_loom))]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
fn queue<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let inner = crate::loom_exports::sync::Arc::new(Queue::new(capacity));

    let producer = Producer {
        inner: inner.clone(),
    };
    let consumer = Consumer { inner };

    (producer, consumer)
}
