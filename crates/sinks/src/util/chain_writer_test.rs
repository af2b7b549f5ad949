//! Tests for chain writers

use crate::util::chain_writer::{ChainWriter, PlainTextWriter};
use parking_lot::Mutex;
use std::io::{self, IoSlice, Write};
use std::sync::Arc;
use tempfile::TempDir;

/// Stream that records everything written to it
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_open_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("access.log");

    let mut chain = PlainTextWriter.open(&path).unwrap();
    chain.write_all(b"hello\n").unwrap();
    chain.finish().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"hello\n");
}

#[test]
fn test_open_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("access.log");
    std::fs::write(&path, b"existing\n").unwrap();

    let mut chain = PlainTextWriter.open(&path).unwrap();
    chain.write_all(b"appended\n").unwrap();
    chain.finish().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"existing\nappended\n");
}

#[test]
fn test_open_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("access.log");
    assert!(PlainTextWriter.open(&path).is_err());
}

#[test]
fn test_writes_reach_the_file_without_flush() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("access.log");

    let mut chain = PlainTextWriter.open(&path).unwrap();
    chain.write_all(b"direct\n").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"direct\n");
    assert_eq!(chain.bytes_written(), 7);

    chain.flush_all().unwrap();
    chain.finish().unwrap();
}

#[test]
fn test_vectored_write_counts_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("access.log");

    let mut chain = PlainTextWriter.open(&path).unwrap();
    let n = chain
        .write_vectored(&[IoSlice::new(b"one\n"), IoSlice::new(b"two\n")])
        .unwrap();
    assert!(n > 0);
    assert_eq!(chain.bytes_written(), n as u64);
    chain.finish().unwrap();

    let contents = std::fs::read(&path).unwrap();
    assert_eq!(&contents[..], &b"one\ntwo\n"[..n]);
}

#[test]
fn test_adopted_stream() {
    let buffer = SharedBuffer::default();
    let mut chain = PlainTextWriter.adopt(Box::new(buffer.clone()));

    chain.write_all(b"one\n").unwrap();
    chain.write_all(b"two\n").unwrap();
    assert_eq!(chain.bytes_written(), 8);
    chain.finish().unwrap();

    assert_eq!(buffer.0.lock().as_slice(), b"one\ntwo\n");
}
