//! Metrics store with per-component enablement
//!
//! The store is the object components record into. Each engine subsystem is
//! gated by a [`MetricsComponent`] bit so instrumentation can be turned on
//! per component; a disabled component costs one relaxed atomic load on the
//! recording path.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::consumer::ConsumerMetrics;

/// Engine subsystems that can be instrumented independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsComponent {
    /// Write-ahead logging (serializer and disk consumer)
    Logging,
    /// Transaction begin/commit/abort accounting
    Transaction,
    /// Version chain garbage collection
    GarbageCollection,
}

impl MetricsComponent {
    #[inline]
    fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Metrics store shared with background tasks
///
/// Holds the per-component enablement bitmask and the metric aggregates for
/// each instrumented subsystem. Recording methods are safe to call from any
/// thread; a component that is not enabled records nothing.
#[derive(Debug, Default)]
pub struct MetricsStore {
    /// Bitmask of enabled components
    enabled: AtomicU8,

    /// Aggregates for the disk log consumer
    consumer: ConsumerMetrics,
}

impl MetricsStore {
    /// Create a store with every component disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a component at construction time
    pub fn with_component(self, component: MetricsComponent) -> Self {
        self.enable_component(component);
        self
    }

    /// Enable recording for a component
    pub fn enable_component(&self, component: MetricsComponent) {
        self.enabled.fetch_or(component.mask(), Ordering::Relaxed);
    }

    /// Disable recording for a component
    pub fn disable_component(&self, component: MetricsComponent) {
        self.enabled.fetch_and(!component.mask(), Ordering::Relaxed);
    }

    /// Check whether a component is enabled
    #[inline]
    pub fn component_enabled(&self, component: MetricsComponent) -> bool {
        self.enabled.load(Ordering::Relaxed) & component.mask() != 0
    }

    /// Record one accumulation window of disk log consumer activity
    ///
    /// `write_us`/`persist_us` are the time spent writing buffers out and
    /// waiting on fsync since the last record; `num_bytes`/`num_buffers`
    /// are the bytes persisted and commit callbacks released.
    #[inline]
    pub fn record_consumer_data(
        &self,
        write_us: u64,
        persist_us: u64,
        num_bytes: u64,
        num_buffers: u64,
    ) {
        self.consumer
            .record_data(write_us, persist_us, num_bytes, num_buffers);
    }

    /// Record one completed fsync on the log file
    #[inline]
    pub fn record_persist(&self) {
        self.consumer.record_persist();
    }

    /// Record one force-flush request served by a persist
    #[inline]
    pub fn record_force_flush(&self) {
        self.consumer.record_force_flush();
    }

    /// Access the disk log consumer aggregates
    #[inline]
    pub fn consumer(&self) -> &ConsumerMetrics {
        &self.consumer
    }
}
