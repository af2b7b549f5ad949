//! Rate-limited logging
//!
//! Keeps repeated failures from flooding the log: a burst of identical
//! problems (a full disk, a pattern with an unknown directive rendered for
//! every record) logs at most once per interval, with a count of what was
//! suppressed in between.
//!
//! # Example
//!
//! ```ignore
//! use accesslog_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! for _ in 0..1000 {
//!     logger.error("access log write failed", &io_error);
//! }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between rate-limited log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most once per interval
///
/// Thread-safe: counters are atomic and the last log time sits behind a
/// mutex.
pub struct RateLimitedLogger {
    min_interval: Duration,

    last_log_time: Mutex<Option<Instant>>,

    /// Occurrences since the last emitted line
    pending: AtomicU64,

    /// Occurrences ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record an error; returns true if it was logged
    pub fn error(&self, message: &str, error: &dyn Display) -> bool {
        let Some(suppressed) = self.admit() else {
            return false;
        };
        let total = self.total.load(Ordering::Relaxed);

        if suppressed > 0 {
            tracing::error!(error = %error, suppressed, total, "{message}");
        } else {
            tracing::error!(error = %error, total, "{message}");
        }
        true
    }

    /// Record a warning; returns true if it was logged
    pub fn warn(&self, message: &str, detail: &dyn Display) -> bool {
        let Some(suppressed) = self.admit() else {
            return false;
        };
        let total = self.total.load(Ordering::Relaxed);

        if suppressed > 0 {
            tracing::warn!(detail = %detail, suppressed, total, "{message}");
        } else {
            tracing::warn!(detail = %detail, total, "{message}");
        }
        true
    }

    /// Occurrences recorded since the last emitted line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Count one occurrence
    ///
    /// Returns the number of occurrences suppressed since the last emitted
    /// line when this one should be logged.
    fn admit(&self) -> Option<u64> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();
            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => return None,
                _ => *last_time = Some(now),
            }
        }

        let pending = self.pending.swap(0, Ordering::Relaxed);
        Some(pending.saturating_sub(1))
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
