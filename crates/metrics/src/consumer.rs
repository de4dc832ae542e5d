//! Disk log consumer metrics
//!
//! Aggregates for the write-ahead log's disk consumer task: time spent
//! handing buffers to the OS versus waiting on fsync, bytes made durable,
//! and commit callbacks released. All fields use atomics for lock-free
//! updates from the consumer thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the disk log consumer task
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    /// Microseconds spent writing filled buffers to the log file
    pub write_us: AtomicU64,
    /// Microseconds spent in fsync
    pub persist_us: AtomicU64,
    /// Bytes made durable
    pub bytes_persisted: AtomicU64,
    /// Commit callbacks released after a persist
    pub buffers_persisted: AtomicU64,
    /// Completed fsyncs on the log file
    pub persist_count: AtomicU64,
    /// Force-flush requests served
    pub force_flushes: AtomicU64,
    /// Accumulation windows recorded
    pub reports: AtomicU64,
}

impl ConsumerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            write_us: AtomicU64::new(0),
            persist_us: AtomicU64::new(0),
            bytes_persisted: AtomicU64::new(0),
            buffers_persisted: AtomicU64::new(0),
            persist_count: AtomicU64::new(0),
            force_flushes: AtomicU64::new(0),
            reports: AtomicU64::new(0),
        }
    }

    /// Record one accumulation window of consumer activity
    #[inline]
    pub fn record_data(&self, write_us: u64, persist_us: u64, num_bytes: u64, num_buffers: u64) {
        self.write_us.fetch_add(write_us, Ordering::Relaxed);
        self.persist_us.fetch_add(persist_us, Ordering::Relaxed);
        self.bytes_persisted.fetch_add(num_bytes, Ordering::Relaxed);
        self.buffers_persisted
            .fetch_add(num_buffers, Ordering::Relaxed);
        self.reports.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed fsync
    #[inline]
    pub fn record_persist(&self) {
        self.persist_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one force-flush request served
    #[inline]
    pub fn record_force_flush(&self) {
        self.force_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    #[inline]
    pub fn snapshot(&self) -> ConsumerMetricsSnapshot {
        ConsumerMetricsSnapshot {
            write_us: self.write_us.load(Ordering::Relaxed),
            persist_us: self.persist_us.load(Ordering::Relaxed),
            bytes_persisted: self.bytes_persisted.load(Ordering::Relaxed),
            buffers_persisted: self.buffers_persisted.load(Ordering::Relaxed),
            persist_count: self.persist_count.load(Ordering::Relaxed),
            force_flushes: self.force_flushes.load(Ordering::Relaxed),
            reports: self.reports.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of consumer metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerMetricsSnapshot {
    pub write_us: u64,
    pub persist_us: u64,
    pub bytes_persisted: u64,
    pub buffers_persisted: u64,
    pub persist_count: u64,
    pub force_flushes: u64,
    pub reports: u64,
}

impl ConsumerMetricsSnapshot {
    /// Average bytes made durable per fsync
    #[inline]
    pub fn avg_bytes_per_persist(&self) -> u64 {
        if self.persist_count == 0 {
            0
        } else {
            self.bytes_persisted / self.persist_count
        }
    }
}

/// Trait for the consumer to provide metrics to a reporter
///
/// The `snapshot()` method is the main requirement - it returns a copy of
/// the current metrics that can be safely used for reporting.
pub trait ConsumerMetricsProvider: Send + Sync {
    /// Unique identifier for this consumer instance
    fn consumer_id(&self) -> &str;

    /// Get a snapshot of current metrics
    fn snapshot(&self) -> ConsumerMetricsSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_data_accumulates() {
        let metrics = ConsumerMetrics::new();

        metrics.record_data(10, 500, 1024, 2);
        metrics.record_data(20, 700, 2048, 5);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.write_us, 30);
        assert_eq!(snapshot.persist_us, 1200);
        assert_eq!(snapshot.bytes_persisted, 3072);
        assert_eq!(snapshot.buffers_persisted, 7);
        assert_eq!(snapshot.reports, 2);
    }

    #[test]
    fn test_avg_bytes_per_persist() {
        let metrics = ConsumerMetrics::new();
        metrics.record_data(0, 0, 9000, 9);
        metrics.record_persist();
        metrics.record_persist();
        metrics.record_persist();

        assert_eq!(metrics.snapshot().avg_bytes_per_persist(), 3000);
    }

    #[test]
    fn test_avg_bytes_per_persist_zero() {
        let snapshot = ConsumerMetricsSnapshot::default();
        assert_eq!(snapshot.avg_bytes_per_persist(), 0);
    }
}
