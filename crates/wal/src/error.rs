//! WAL error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the write-ahead log
#[derive(Debug, Error)]
pub enum WalError {
    /// I/O error on the log file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to open the log file
    #[error("failed to open log file: {path}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for WAL operations
pub type Result<T> = std::result::Result<T, WalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalError::OpenLog {
            path: PathBuf::from("/no/such/dir/wal.log"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/no/such/dir/wal.log"));

        let err = WalError::InvalidConfig("num_buffers must be at least 1".into());
        assert!(err.to_string().contains("num_buffers"));
    }
}
