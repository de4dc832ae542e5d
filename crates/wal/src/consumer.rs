//! Disk log consumer
//!
//! The final stage of the write-ahead log pipeline. Upstream, the log
//! serializer acquires empty buffers, fills them with serialized records,
//! and submits them together with the commit callbacks of the transactions
//! whose commit records they stage. The consumer thread drains submissions
//! to the log file, fsyncs at a batched rate, and releases each commit
//! callback only after the fsync covering its record has completed.
//!
//! # Architecture
//!
//! ```text
//! [serializer] --acquire()-- [empty queue] <---recycle--------+
//!      |                                                      |
//!      +--submit()--> [filled queue] --> [consumer thread] ---+
//!                                              |
//!                                   write --> fsync --> callbacks
//! ```
//!
//! # Group commit
//!
//! Writing and persisting are decoupled: every drained buffer is written
//! immediately, but fsync runs at most once per round, triggered by the
//! persist interval, the persist threshold, a force-flush, or shutdown.
//! Because all buffers append to one file, that single fsync makes every
//! previously written byte durable, amortizing its cost across all
//! transactions committed in the round.
//!
//! # Durability contract
//!
//! A commit callback runs exactly once, strictly after the fsync covering
//! its transaction's commit record. Callbacks fire in commit-record order.
//! After `shutdown()` returns, every submitted buffer has been written and
//! persisted and every attached callback has run.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use keel_metrics::{
    ConsumerMetricsProvider, ConsumerMetricsSnapshot, MetricsComponent, MetricsStore,
};

use crate::buffer::{CommitCallback, FilledEntry, LogBuffer};
use crate::config::WalConfig;
use crate::error::{Result, WalError};
use crate::queue::BufferQueue;

/// Wake/force/shutdown coordination
///
/// Two condition variables share one mutex: the consumer waits on `wake`
/// with the persist interval as timeout, force-flush callers wait on
/// `persist_done`. Holding `state` across the persist step is what makes a
/// returning force-flush caller certain that a covering fsync completed.
#[derive(Debug)]
struct Control {
    state: Mutex<ControlState>,
    wake: Condvar,
    persist_done: Condvar,
}

#[derive(Default, Debug)]
struct ControlState {
    /// Set by force-flush callers, cleared by the consumer after the
    /// persist that observed it
    force_persist: bool,
}

/// State shared between the consumer thread and its handles
#[derive(Debug)]
struct ConsumerShared {
    config: WalConfig,

    /// Shared append-mode handle; every buffer writes to this file
    file: Arc<File>,

    /// Buffers available to the serializer
    empty: BufferQueue<LogBuffer>,

    /// Filled buffers awaiting the consumer
    filled: BufferQueue<FilledEntry>,

    control: Control,

    /// True from loop entry until terminate; monotonically false afterwards
    running: AtomicBool,

    /// Optional metrics sink; `None` skips all recording
    metrics: Option<Arc<MetricsStore>>,
}

impl ConsumerShared {
    /// Request an immediate persist and block until it completes
    fn force_flush(&self) {
        let mut state = self.control.state.lock();
        state.force_persist = true;
        self.control.wake.notify_one();
        while state.force_persist {
            self.control.persist_done.wait(&mut state);
        }
    }

    /// Dequeue and write out every currently filled buffer
    ///
    /// Extends `pending` with each entry's callbacks in drain order and
    /// recycles the buffer. Does not block on fsync.
    fn drain_filled(&self, pending: &mut Vec<CommitCallback>, bytes_since_persist: &mut u64) {
        while let Some(entry) = self.filled.dequeue() {
            let FilledEntry {
                mut buffer,
                mut callbacks,
            } = entry;
            match buffer.flush() {
                Ok(n) => *bytes_since_persist += n,
                Err(e) => {
                    // A partial write would corrupt the log; there is no
                    // way to honor the commit contract past this point.
                    tracing::error!(id = %self.config.id, error = %e, "log write failed, aborting");
                    std::process::abort();
                }
            }
            pending.append(&mut callbacks);
            self.empty.enqueue(buffer);
        }
    }

    /// Fsync the log file and release every pending commit callback
    ///
    /// Runs under the control mutex so force-flush callers serialize with
    /// the persist they are waiting on. Returns the number of callbacks
    /// released.
    fn persist_round(&self, pending: &mut Vec<CommitCallback>) -> u64 {
        let mut state = self.control.state.lock();

        // One fsync covers the flushed bytes of every buffer (they all
        // share the file).
        if let Err(e) = self.file.sync_all() {
            // Callbacks must never fire after a failed fsync.
            tracing::error!(id = %self.config.id, error = %e, "log fsync failed, aborting");
            std::process::abort();
        }

        let released = pending.len() as u64;
        for callback in pending.drain(..) {
            callback();
        }

        if let Some(store) = &self.metrics {
            store.record_persist();
            if state.force_persist {
                store.record_force_flush();
            }
        }
        state.force_persist = false;
        drop(state);

        self.control.persist_done.notify_all();
        released
    }
}

/// The consumer loop, run on its own OS thread
fn run_consumer_loop(shared: &ConsumerShared) {
    shared.running.store(true, Ordering::Release);
    tracing::info!(
        id = %shared.config.id,
        buffers = shared.config.num_buffers,
        "disk log consumer running"
    );

    let mut pending: Vec<CommitCallback> = Vec::new();
    let mut bytes_since_persist: u64 = 0;
    let mut last_persist = Instant::now();

    // Write time accumulates across rounds until a window is recorded
    let mut write_us: u64 = 0;

    loop {
        // Persist outcome of this round only; a round that does not
        // persist must not report a previous round's fsync.
        let mut persist_us: u64 = 0;
        let mut num_bytes: u64 = 0;
        let mut num_buffers: u64 = 0;

        {
            // Wait until there is work, a force-flush, a shutdown, or the
            // persist interval elapses.
            let mut state = shared.control.state.lock();
            let wake_now = state.force_persist
                || !shared.filled.is_empty()
                || !shared.running.load(Ordering::Acquire);
            if !wake_now {
                shared
                    .control
                    .wake
                    .wait_for(&mut state, shared.config.persist_interval);
            }
        }

        let write_start = Instant::now();
        shared.drain_filled(&mut pending, &mut bytes_since_persist);
        write_us += write_start.elapsed().as_micros() as u64;

        let timed_out = last_persist.elapsed() > shared.config.persist_interval;
        let over_threshold = bytes_since_persist > shared.config.persist_threshold as u64;
        let forced = shared.control.state.lock().force_persist;
        let running = shared.running.load(Ordering::Acquire);

        if timed_out || over_threshold || forced || !running {
            let persist_start = Instant::now();
            num_buffers = shared.persist_round(&mut pending);
            num_bytes = bytes_since_persist;
            bytes_since_persist = 0;
            last_persist = Instant::now();
            persist_us = persist_start.elapsed().as_micros() as u64;
        }

        if num_bytes > 0 {
            if let Some(store) = shared
                .metrics
                .as_ref()
                .filter(|s| s.component_enabled(MetricsComponent::Logging))
            {
                store.record_consumer_data(write_us, persist_us, num_bytes, num_buffers);
                write_us = 0;
            }
        }

        if !shared.running.load(Ordering::Acquire) {
            break;
        }
    }

    // Nothing may survive shutdown: one final unconditional drain and
    // persist, so every submitted buffer is durable and every callback has
    // run before the thread exits.
    shared.drain_filled(&mut pending, &mut bytes_since_persist);
    shared.persist_round(&mut pending);

    tracing::info!(id = %shared.config.id, "disk log consumer stopped");
}

/// The disk log consumer, created stopped
///
/// Opens the log file, allocates the buffer pool, and hands out producer
/// handles. [`WalConsumer::start`] consumes it and spawns the consumer
/// thread; shutting down before starting is therefore unrepresentable.
#[derive(Debug)]
pub struct WalConsumer {
    shared: Arc<ConsumerShared>,
}

impl WalConsumer {
    /// Open the log file at `path` and allocate the buffer pool
    ///
    /// Buffers are created up front and pre-enqueued on the empty queue;
    /// their lifetime equals the consumer's.
    pub fn create(path: impl AsRef<Path>, config: WalConfig) -> Result<Self> {
        config.validate()?;

        let path = path.as_ref();
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| WalError::OpenLog {
                path: path.to_path_buf(),
                source,
            })?;
        let file = Arc::new(file);

        let empty = BufferQueue::with_capacity(config.num_buffers);
        for _ in 0..config.num_buffers {
            empty.enqueue(LogBuffer::new(Arc::clone(&file), config.buffer_capacity));
        }
        let filled = BufferQueue::with_capacity(config.num_buffers);

        tracing::debug!(
            id = %config.id,
            path = %path.display(),
            buffers = config.num_buffers,
            buffer_capacity = config.buffer_capacity,
            "opened log file"
        );

        Ok(Self {
            shared: Arc::new(ConsumerShared {
                config,
                file,
                empty,
                filled,
                control: Control {
                    state: Mutex::new(ControlState::default()),
                    wake: Condvar::new(),
                    persist_done: Condvar::new(),
                },
                running: AtomicBool::new(false),
                metrics: None,
            }),
        })
    }

    /// Attach a metrics store
    ///
    /// Consumer data is recorded only when the store enables
    /// [`MetricsComponent::Logging`]. Must be called before any handle is
    /// created.
    pub fn with_metrics(mut self, store: Arc<MetricsStore>) -> Self {
        let shared = Arc::get_mut(&mut self.shared)
            .expect("with_metrics called after handles were created");
        shared.metrics = Some(store);
        self
    }

    /// Get a producer handle for the serializer side
    ///
    /// Handles are cheap to clone and stay valid after `start` consumes
    /// the consumer.
    pub fn handle(&self) -> WalHandle {
        WalHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get a metrics handle for reporting, if a store is attached
    pub fn metrics_handle(&self) -> Option<ConsumerMetricsHandle> {
        self.shared.metrics.as_ref().map(|store| ConsumerMetricsHandle {
            id: self.shared.config.id.clone(),
            store: Arc::clone(store),
        })
    }

    /// Spawn the consumer thread and wait until its loop is running
    ///
    /// Returning only once the loop is observed running means the returned
    /// handle may be shut down immediately.
    pub fn start(self) -> ConsumerHandle {
        let shared = Arc::clone(&self.shared);
        let thread = thread::Builder::new()
            .name(format!("{}-consumer", self.shared.config.id))
            .spawn(move || run_consumer_loop(&shared))
            .expect("failed to spawn disk log consumer thread");

        while !self.shared.running.load(Ordering::Acquire) {
            thread::yield_now();
        }

        ConsumerHandle {
            shared: self.shared,
            thread,
        }
    }
}

/// Producer-side handle: acquire buffers, submit filled ones, force flushes
#[derive(Clone)]
pub struct WalHandle {
    shared: Arc<ConsumerShared>,
}

impl WalHandle {
    /// Take a buffer from the empty queue without blocking
    ///
    /// Returns `None` when every buffer is in flight; the caller may
    /// spin or yield and retry.
    pub fn acquire(&self) -> Option<LogBuffer> {
        self.shared.empty.dequeue()
    }

    /// Submit a filled buffer with the ordered commit callbacks of the
    /// transactions whose commit records it stages, and wake the consumer
    ///
    /// Each callback runs exactly once, after the fsync covering this
    /// buffer's bytes.
    pub fn submit(&self, buffer: LogBuffer, callbacks: Vec<CommitCallback>) {
        self.shared.filled.enqueue(FilledEntry::new(buffer, callbacks));
        // Signal under the mutex so the wakeup cannot land between the
        // consumer's predicate check and its wait registration.
        let _state = self.shared.control.state.lock();
        self.shared.control.wake.notify_one();
    }

    /// Trigger an immediate persist and block until it completes
    ///
    /// Safe to call from any number of threads concurrently; every caller
    /// returns only after an fsync that started at or after its call
    /// began. Must not be called after the consumer has shut down: there
    /// is no persist left to wake the caller.
    pub fn force_flush(&self) {
        self.shared.force_flush();
    }

    /// Number of buffers currently available to producers
    pub fn buffers_available(&self) -> usize {
        self.shared.empty.len()
    }
}

impl std::fmt::Debug for WalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalHandle")
            .field("id", &self.shared.config.id)
            .field("buffers_available", &self.shared.empty.len())
            .finish()
    }
}

/// Handle to the running consumer thread
pub struct ConsumerHandle {
    shared: Arc<ConsumerShared>,
    thread: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Trigger an immediate persist and block until it completes
    pub fn force_flush(&self) {
        self.shared.force_flush();
    }

    /// Stop the consumer and wait for it to finish
    ///
    /// Cooperative: in-flight writes and fsyncs complete, and the loop
    /// runs one final drain and persist before exiting. When this
    /// returns, no filled buffer remains and every callback ever
    /// submitted has been invoked.
    pub fn shutdown(self) {
        // Guard the window between thread spawn and loop entry.
        while !self.shared.running.load(Ordering::Acquire) {
            thread::yield_now();
        }
        self.shared.running.store(false, Ordering::Release);
        {
            let _state = self.shared.control.state.lock();
            self.shared.control.wake.notify_one();
        }

        if self.thread.join().is_err() {
            tracing::error!(id = %self.shared.config.id, "consumer thread panicked during shutdown");
        }
    }
}

/// Handle for accessing consumer metrics
///
/// Obtained before `start` and valid afterwards; holds an Arc to the
/// store, so it outlives the consumer itself.
#[derive(Clone)]
pub struct ConsumerMetricsHandle {
    id: String,
    store: Arc<MetricsStore>,
}

impl ConsumerMetricsProvider for ConsumerMetricsHandle {
    fn consumer_id(&self) -> &str {
        &self.id
    }

    fn snapshot(&self) -> ConsumerMetricsSnapshot {
        self.store.consumer().snapshot()
    }
}

#[cfg(test)]
#[path = "consumer_test.rs"]
mod consumer_test;
