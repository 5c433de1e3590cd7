//! Observability and Metrics
//!
//! Counters for the extension store lifecycle: registrations, value traffic,
//! skipped input and teardown defects.
//!
//! Uses atomic counters so the global instance can live in a `static`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for extension operations
#[derive(Debug)]
pub struct ExtMetrics {
    /// Items added to an extension manager
    pub items_registered: AtomicU64,
    /// Items removed by per-unit unregistration
    pub items_unregistered: AtomicU64,
    /// Values attached to a store
    pub values_set: AtomicU64,
    /// Values released through their item
    pub values_freed: AtomicU64,
    /// Serialized values skipped as malformed
    pub unserialize_skipped: AtomicU64,
    /// Metadata records naming no registered item
    pub unknown_records: AtomicU64,
    /// Stores dropped without `free_all`
    pub teardown_violations: AtomicU64,
    /// Values still attached to a store dropped without `free_all`
    pub leaked_values: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl ExtMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            items_registered: AtomicU64::new(0),
            items_unregistered: AtomicU64::new(0),
            values_set: AtomicU64::new(0),
            values_freed: AtomicU64::new(0),
            unserialize_skipped: AtomicU64::new(0),
            unknown_records: AtomicU64::new(0),
            teardown_violations: AtomicU64::new(0),
            leaked_values: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn item_registered(&self) {
        self.items_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_unregistered(&self) {
        self.items_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value_set(&self) {
        self.values_set.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value_freed(&self) {
        self.values_freed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed value that was not attached
    pub fn unserialize_skipped(&self) {
        self.unserialize_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a metadata record for an unknown item
    pub fn unknown_record(&self) {
        self.unknown_records.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a store dropped without teardown
    pub fn teardown_violation(&self) {
        self.teardown_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn values_leaked(&self, count: u64) {
        self.leaked_values.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_registered: self.items_registered.load(Ordering::Relaxed),
            items_unregistered: self.items_unregistered.load(Ordering::Relaxed),
            values_set: self.values_set.load(Ordering::Relaxed),
            values_freed: self.values_freed.load(Ordering::Relaxed),
            unserialize_skipped: self.unserialize_skipped.load(Ordering::Relaxed),
            unknown_records: self.unknown_records.load(Ordering::Relaxed),
            teardown_violations: self.teardown_violations.load(Ordering::Relaxed),
            leaked_values: self.leaked_values.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            items_registered = snapshot.items_registered,
            items_unregistered = snapshot.items_unregistered,
            values_set = snapshot.values_set,
            values_freed = snapshot.values_freed,
            unserialize_skipped = snapshot.unserialize_skipped,
            unknown_records = snapshot.unknown_records,
            teardown_violations = snapshot.teardown_violations,
            leaked_values = snapshot.leaked_values,
            uptime_seconds = snapshot.uptime_seconds,
            "Extension metrics snapshot"
        );
    }
}

impl Default for ExtMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub items_registered: u64,
    pub items_unregistered: u64,
    pub values_set: u64,
    pub values_freed: u64,
    pub unserialize_skipped: u64,
    pub unknown_records: u64,
    pub teardown_violations: u64,
    pub leaked_values: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance
static METRICS: once_cell::sync::Lazy<ExtMetrics> = once_cell::sync::Lazy::new(ExtMetrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static ExtMetrics {
    &METRICS
}

/// Initialize metrics collection (call once at startup)
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Logs how long an operation took when dropped
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            duration_ms = self.start.elapsed().as_millis(),
            "Operation completed"
        );
    }
}
