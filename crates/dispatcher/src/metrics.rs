//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use observability::{FlushStatsAggregator, FlushStatsSummary};

/// Metrics for a single dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Items accepted by submit
    submitted: AtomicU64,
    /// Items rejected after shutdown
    rejected: AtomicU64,
    /// Failed attempts to schedule a flush
    scheduling_failures: AtomicU64,
    /// Non-empty flushes handed to the sink
    flushes: AtomicU64,
    /// Flushes where at least one item failed
    failed_flushes: AtomicU64,
    /// Items accepted by the sink
    delivered_items: AtomicU64,
    /// Items the sink failed to deliver
    failed_items: AtomicU64,
    /// Items dropped at shutdown
    discarded_items: AtomicU64,
    /// Deliveries currently running
    in_flight: AtomicUsize,
    /// Highest `in_flight` ever observed
    max_in_flight: AtomicUsize,
    /// Batch size / latency distribution
    stats: Mutex<FlushStatsAggregator>,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scheduling_failures(&self) {
        self.scheduling_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_discarded(&self, count: usize) {
        self.discarded_items
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record the outcome of one delivery
    pub fn record_flush(&self, batch_size: usize, failed: usize, latency_ms: f64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.delivered_items
            .fetch_add(batch_size.saturating_sub(failed) as u64, Ordering::Relaxed);
        if failed > 0 {
            self.failed_flushes.fetch_add(1, Ordering::Relaxed);
            self.failed_items.fetch_add(failed as u64, Ordering::Relaxed);
        }
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(batch_size, latency_ms);
    }

    /// Mark a delivery as running until the guard drops
    pub fn begin_delivery(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { metrics: self }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Batch size and latency distribution so far
    pub fn flush_stats(&self) -> FlushStatsSummary {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted(),
            rejected: self.rejected.load(Ordering::Relaxed),
            scheduling_failures: self.scheduling_failures.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            delivered_items: self.delivered_items.load(Ordering::Relaxed),
            failed_items: self.failed_items.load(Ordering::Relaxed),
            discarded_items: self.discarded_items.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            max_in_flight: self.max_in_flight(),
        }
    }
}

/// Decrements the in-flight gauge on drop, including on panic
pub struct InFlightGuard<'a> {
    metrics: &'a DispatcherMetrics,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub scheduling_failures: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub delivered_items: u64,
    pub failed_items: u64,
    pub discarded_items: u64,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flush_counts() {
        let metrics = DispatcherMetrics::new();
        metrics.record_flush(5, 0, 1.0);
        metrics.record_flush(4, 4, 2.0);

        let snap = metrics.snapshot();
        assert_eq!(snap.flushes, 2);
        assert_eq!(snap.failed_flushes, 1);
        assert_eq!(snap.delivered_items, 5);
        assert_eq!(snap.failed_items, 4);
        assert_eq!(metrics.flush_stats().batch_size.count, 2);
    }

    #[test]
    fn test_in_flight_guard() {
        let metrics = DispatcherMetrics::new();
        {
            let _a = metrics.begin_delivery();
            assert_eq!(metrics.in_flight(), 1);
        }
        assert_eq!(metrics.in_flight(), 0);
        assert_eq!(metrics.max_in_flight(), 1);
    }
}
