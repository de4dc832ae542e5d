//! Tests for log buffer staging and flushing

use std::fs::{self, File};
use std::sync::Arc;

use tempfile::tempdir;

use crate::buffer::LogBuffer;

fn open_log(dir: &tempfile::TempDir) -> (Arc<File>, std::path::PathBuf) {
    let path = dir.path().join("wal.log");
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .unwrap();
    (Arc::new(file), path)
}

#[test]
fn test_write_respects_capacity() {
    let dir = tempdir().unwrap();
    let (file, _) = open_log(&dir);
    let mut buf = LogBuffer::new(file, 8);

    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.remaining(), 8);

    // Fits entirely
    assert_eq!(buf.write(b"abcd"), 4);
    assert_eq!(buf.len(), 4);
    assert_eq!(buf.remaining(), 4);

    // Clamped to the remaining capacity
    assert_eq!(buf.write(b"efghij"), 4);
    assert_eq!(buf.len(), 8);
    assert_eq!(buf.remaining(), 0);

    // Full buffer accepts nothing
    assert_eq!(buf.write(b"k"), 0);
}

#[test]
fn test_flush_appends_and_clears() {
    let dir = tempdir().unwrap();
    let (file, path) = open_log(&dir);
    let mut buf = LogBuffer::new(file, 64);

    buf.write(b"hello ");
    buf.write(b"world");
    assert_eq!(buf.flush().unwrap(), 11);
    assert!(buf.is_empty());

    // A second flush with nothing staged writes nothing
    assert_eq!(buf.flush().unwrap(), 0);

    buf.write(b"!");
    assert_eq!(buf.flush().unwrap(), 1);

    assert_eq!(fs::read(&path).unwrap(), b"hello world!");
}

#[test]
fn test_buffers_share_one_file() {
    let dir = tempdir().unwrap();
    let (file, path) = open_log(&dir);

    let mut a = LogBuffer::new(Arc::clone(&file), 64);
    let mut b = LogBuffer::new(file, 64);

    a.write(b"first");
    b.write(b"second");
    a.flush().unwrap();
    b.flush().unwrap();

    // Persisting through either buffer covers both flushes
    b.persist().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"firstsecond");
}

#[test]
fn test_persist_with_empty_staging() {
    let dir = tempdir().unwrap();
    let (file, _) = open_log(&dir);
    let buf = LogBuffer::new(file, 64);

    // fsync on an empty file is a no-op but must succeed
    buf.persist().unwrap();
}

#[test]
fn test_debug_does_not_expose_contents() {
    let dir = tempdir().unwrap();
    let (file, _) = open_log(&dir);
    let mut buf = LogBuffer::new(file, 64);
    buf.write(b"secret");

    let debug = format!("{:?}", buf);
    assert!(debug.contains("LogBuffer"));
    assert!(!debug.contains("secret"));
}
