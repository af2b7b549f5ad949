//! Pipeline metrics
//!
//! Atomic counters with relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Records taken from the source
    records_received: AtomicU64,

    /// Records whose kind is not logged
    records_skipped: AtomicU64,

    /// Lines rendered from accepted records
    lines_rendered: AtomicU64,

    /// Lines the sink accepted
    lines_written: AtomicU64,

    /// Directives that rendered as `-`
    unresolved_directives: AtomicU64,

    /// Writes rejected by the sink and held for retry
    writes_held: AtomicU64,

    /// Rotations requested by the trigger
    rotations_triggered: AtomicU64,
}

impl PipelineMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            lines_rendered: AtomicU64::new(0),
            lines_written: AtomicU64::new(0),
            unresolved_directives: AtomicU64::new(0),
            writes_held: AtomicU64::new(0),
            rotations_triggered: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rendered line and how many of its directives fell back
    #[inline]
    pub fn record_rendered(&self, unresolved: usize) {
        self.lines_rendered.fetch_add(1, Ordering::Relaxed);
        self.unresolved_directives
            .fetch_add(unresolved as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self) {
        self.lines_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_held(&self) {
        self.writes_held.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rotation_triggered(&self) {
        self.rotations_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            lines_rendered: self.lines_rendered.load(Ordering::Relaxed),
            lines_written: self.lines_written.load(Ordering::Relaxed),
            unresolved_directives: self.unresolved_directives.load(Ordering::Relaxed),
            writes_held: self.writes_held.load(Ordering::Relaxed),
            rotations_triggered: self.rotations_triggered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pipeline metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub records_received: u64,
    pub records_skipped: u64,
    pub lines_rendered: u64,
    pub lines_written: u64,
    pub unresolved_directives: u64,
    pub writes_held: u64,
    pub rotations_triggered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(PipelineMetrics::new().snapshot(), Default::default());
    }

    #[test]
    fn test_counters() {
        let metrics = PipelineMetrics::new();

        metrics.record_received();
        metrics.record_received();
        metrics.record_skipped();
        metrics.record_rendered(3);
        metrics.record_written();
        metrics.record_held();
        metrics.record_rotation_triggered();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_received, 2);
        assert_eq!(snapshot.records_skipped, 1);
        assert_eq!(snapshot.lines_rendered, 1);
        assert_eq!(snapshot.unresolved_directives, 3);
        assert_eq!(snapshot.lines_written, 1);
        assert_eq!(snapshot.writes_held, 1);
        assert_eq!(snapshot.rotations_triggered, 1);
    }
}
