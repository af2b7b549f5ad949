//! Common types for sinks

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Counters kept by a sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Lines handed to the operating system in full
    pub lines_written: AtomicU64,

    pub bytes_written: AtomicU64,

    /// Accepted lines still queued when the sink closed
    pub lines_dropped: AtomicU64,

    /// Failed writes and flushes, each of which detached the handle
    pub write_errors: AtomicU64,

    pub flush_count: AtomicU64,

    /// Handles opened, including the initial open
    pub opens: AtomicU64,

    /// Successful rotations
    pub rotations: AtomicU64,

    /// Rotations whose reopen failed
    pub failed_rotations: AtomicU64,

    /// Previous handles that failed to sync or close
    pub drain_errors: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            lines_dropped: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            opens: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            failed_rotations: AtomicU64::new(0),
            drain_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn line_written(&self) {
        self.lines_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn wrote_bytes(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn dropped(&self, lines: usize) {
        self.lines_dropped.fetch_add(lines as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn opened(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful rotation, which also opened a handle
    #[inline]
    pub fn rotated(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rotation_failed(&self) {
        self.failed_rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn drain_error(&self) {
        self.drain_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            lines_written: self.lines_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            opens: self.opens.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            failed_rotations: self.failed_rotations.load(Ordering::Relaxed),
            drain_errors: self.drain_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkMetricsSnapshot {
    pub lines_written: u64,
    pub bytes_written: u64,
    pub lines_dropped: u64,
    pub write_errors: u64,
    pub flush_count: u64,
    pub opens: u64,
    pub rotations: u64,
    pub failed_rotations: u64,
    pub drain_errors: u64,
}

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Opening the output failed
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing the current handle failed; the handle is detached
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Syncing or closing the final handle failed
    #[error("close failed: {0}")]
    Close(#[source] io::Error),

    /// An earlier failure detached the handle and no rotation has reattached it
    #[error("sink is detached from its output")]
    Detached,

    /// A rotation is between closing the old handle and opening the new one
    #[error("sink has no open output")]
    Unattached,

    #[error("sink is closed")]
    Closed,
}

impl SinkError {
    /// Create an open error for `path`
    pub fn open(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether a later rotation may let a retry of the same line succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
