//! Bounded lock-free buffer queues
//!
//! The empty and filled queues are the two halves of the buffer recycle
//! loop between the serializer and the disk consumer. Both ends are
//! non-blocking; the consumer polls under its wake condition instead of
//! blocking on a dequeue. Capacity equals the buffer population fixed at
//! startup, and buffer ownership only ever moves between the two queues
//! and the consumer's working set, so an enqueue onto a full queue is a
//! contract violation rather than backpressure.

use crossbeam::queue::ArrayQueue;

/// Bounded multi-producer/multi-consumer FIFO of buffer currency
#[derive(Debug)]
pub struct BufferQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BufferQueue<T> {
    /// Create a queue holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Append an entry
    pub fn enqueue(&self, entry: T) {
        if self.inner.push(entry).is_err() {
            debug_assert!(false, "enqueue on a full buffer queue");
            tracing::warn!("buffer queue over capacity, entry dropped");
        }
    }

    /// Remove the oldest entry, if any
    #[inline]
    pub fn dequeue(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Whether the queue currently holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of entries currently held
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Maximum number of entries
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
