//! Keel - WAL
//!
//! The disk consumer stage of the write-ahead log: receives serialized log
//! buffers from the upstream serializer, writes them durably to a single
//! append-only log file, and releases each transaction's commit callback
//! exactly after the bytes containing its commit record are on stable
//! storage.
//!
//! # Architecture
//!
//! Buffers circulate in a fixed pool between two lock-free queues. The
//! serializer acquires from the empty queue, fills, and submits to the
//! filled queue; a single consumer thread drains the filled queue to the
//! log file, fsyncs at a batched rate (group commit), fires the released
//! commit callbacks in order, and recycles the buffers.
//!
//! ```text
//! [serializer] --> [filled queue] --> [consumer thread] --> log file
//!       ^                                    |
//!       +--------- [empty queue] <-----------+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keel_wal::{WalConfig, WalConsumer};
//!
//! let consumer = WalConsumer::create("wal.log", WalConfig::default())?;
//! let wal = consumer.handle();
//! let running = consumer.start();
//!
//! let mut buffer = wal.acquire().expect("pool exhausted");
//! buffer.write(&commit_record);
//! wal.submit(buffer, vec![Box::new(move || waiter.release())]);
//!
//! wal.force_flush(); // returns once the record is durable
//! running.shutdown();
//! ```
//!
//! # Durability
//!
//! `submit` is not an acknowledgement. A transaction may only be reported
//! committed from its commit callback, which the consumer invokes strictly
//! after a successful fsync covering the buffer that staged the record.
//! I/O errors on the write or fsync path abort the process: a log that can
//! no longer persist has no way to honor commits already promised.

mod buffer;
mod config;
mod consumer;
mod error;
mod queue;

pub use buffer::{CommitCallback, LogBuffer};
pub use config::WalConfig;
pub use consumer::{ConsumerHandle, ConsumerMetricsHandle, WalConsumer, WalHandle};
pub use error::{Result, WalError};
pub use queue::BufferQueue;
