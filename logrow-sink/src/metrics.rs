//! Sink counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic ordering used for metrics (Relaxed is sufficient for counters).
const METRIC_ORDERING: Ordering = Ordering::Relaxed;

/// Per-sink counters, updated on every emit.
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Rows written
    events_emitted: AtomicU64,
    /// Events dropped for any reason
    events_failed: AtomicU64,
    /// Failures acquiring a connection
    connection_failures: AtomicU64,
    /// Failures executing the INSERT
    execution_failures: AtomicU64,
    /// Failures extracting column values
    extraction_failures: AtomicU64,
}

/// Point-in-time copy of [`SinkMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkMetricsSnapshot {
    pub events_emitted: u64,
    pub events_failed: u64,
    pub connection_failures: u64,
    pub execution_failures: u64,
    pub extraction_failures: u64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            events_emitted: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            extraction_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_emitted(&self) {
        self.events_emitted.fetch_add(1, METRIC_ORDERING);
    }

    #[inline]
    pub fn record_connection_failure(&self) {
        self.connection_failures.fetch_add(1, METRIC_ORDERING);
        self.events_failed.fetch_add(1, METRIC_ORDERING);
    }

    #[inline]
    pub fn record_execution_failure(&self) {
        self.execution_failures.fetch_add(1, METRIC_ORDERING);
        self.events_failed.fetch_add(1, METRIC_ORDERING);
    }

    #[inline]
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, METRIC_ORDERING);
        self.events_failed.fetch_add(1, METRIC_ORDERING);
    }

    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            events_emitted: self.events_emitted.load(METRIC_ORDERING),
            events_failed: self.events_failed.load(METRIC_ORDERING),
            connection_failures: self.connection_failures.load(METRIC_ORDERING),
            execution_failures: self.execution_failures.load(METRIC_ORDERING),
            extraction_failures: self.extraction_failures.load(METRIC_ORDERING),
        }
    }
}
