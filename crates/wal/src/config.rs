//! Consumer configuration

use std::time::Duration;

use crate::error::{Result, WalError};

/// Configuration for the disk log consumer
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Consumer identifier (used in logging and metrics)
    pub id: String,

    /// Maximum wall time between consecutive fsyncs
    pub persist_interval: Duration,

    /// Un-fsynced byte count that unconditionally triggers a persist
    pub persist_threshold: usize,

    /// Number of log buffers circulating between serializer and consumer
    pub num_buffers: usize,

    /// Staging capacity of each log buffer in bytes
    pub buffer_capacity: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            id: "wal".into(),
            persist_interval: Duration::from_millis(10),
            persist_threshold: 1024 * 1024, // 1 MiB
            num_buffers: 16,
            buffer_capacity: 64 * 1024, // 64 KiB
        }
    }
}

impl WalConfig {
    /// Create config with a custom identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Create config with a custom persist interval
    pub fn with_persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval = interval;
        self
    }

    /// Create config with a custom persist threshold
    pub fn with_persist_threshold(mut self, threshold: usize) -> Self {
        self.persist_threshold = threshold;
        self
    }

    /// Create config with a custom buffer pool size
    pub fn with_num_buffers(mut self, num_buffers: usize) -> Self {
        self.num_buffers = num_buffers;
        self
    }

    /// Create config with a custom per-buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_buffers == 0 {
            return Err(WalError::InvalidConfig(
                "num_buffers must be at least 1".into(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(WalError::InvalidConfig(
                "buffer_capacity must be at least 1 byte".into(),
            ));
        }
        Ok(())
    }
}
