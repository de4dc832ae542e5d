//! Log buffers and the filled-entry currency
//!
//! A [`LogBuffer`] is one serialization target: a fixed-capacity staging
//! region over the shared append-mode log file. The serializer fills it,
//! the consumer flushes it to the OS and recycles it. Every buffer of one
//! consumer holds a handle to the *same* file, so flushing any buffer
//! appends to the one log and a single fsync covers all previously flushed
//! bytes regardless of which buffer staged them.
//!
//! Two layers of durability:
//! ```text
//! flush()    → staging region → OS page cache   (not durable)
//! persist()  → OS page cache  → physical disk   (durable)
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use bytes::BytesMut;

/// Callback releasing the commit waiter of one transaction
///
/// Invoked by the consumer exactly once, after the bytes containing the
/// transaction's commit record have been fsynced. `FnOnce` makes a second
/// invocation unrepresentable.
pub type CommitCallback = Box<dyn FnOnce() + Send>;

/// A fixed-capacity staging buffer over the shared log file
pub struct LogBuffer {
    /// Shared append-mode handle to the log file
    file: Arc<File>,

    /// In-memory staging region
    staging: BytesMut,

    /// Staging capacity; `write` never grows the region past this
    capacity: usize,
}

impl LogBuffer {
    pub(crate) fn new(file: Arc<File>, capacity: usize) -> Self {
        Self {
            file,
            staging: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Staging capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently staged
    #[inline]
    pub fn len(&self) -> usize {
        self.staging.len()
    }

    /// Whether the staging region is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Remaining staging capacity
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.staging.len()
    }

    /// Stage up to `remaining()` bytes, returning the number copied
    ///
    /// A short copy means the buffer is full; the caller submits it and
    /// continues in the next buffer.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.staging.extend_from_slice(&bytes[..n]);
        n
    }

    /// Hand the staged bytes to the OS and clear the staging region
    ///
    /// Returns the number of bytes written. Not durable: the bytes have
    /// only left user space for the kernel page cache.
    pub fn flush(&mut self) -> io::Result<u64> {
        let n = self.staging.len() as u64;
        (&*self.file).write_all(&self.staging)?;
        self.staging.clear();
        Ok(n)
    }

    /// Block until all previously flushed bytes on the log file are on
    /// stable storage
    ///
    /// Operates on the file, not this staging region: one `persist` covers
    /// the flushed bytes of every buffer sharing the file.
    pub fn persist(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A filled buffer together with the commit callbacks whose records it staged
///
/// The filled-queue currency behind `submit()`. The callback list is ordered
/// by commit-record position within the buffer and is never sorted or
/// deduplicated.
pub(crate) struct FilledEntry {
    pub(crate) buffer: LogBuffer,
    pub(crate) callbacks: Vec<CommitCallback>,
}

impl FilledEntry {
    /// Pair a filled buffer with its ordered commit callbacks
    pub(crate) fn new(buffer: LogBuffer, callbacks: Vec<CommitCallback>) -> Self {
        Self { buffer, callbacks }
    }
}

impl std::fmt::Debug for FilledEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilledEntry")
            .field("buffer", &self.buffer)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
