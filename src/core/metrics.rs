//! Dispatcher metrics for observability
//!
//! Counters for monitoring dispatcher health: events passed through, target writes that
//! failed, and how configuration reloads went.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for dispatcher observability
///
/// # Example
///
/// ```
/// use micrologger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_written();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.total_written(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events accepted by `write`
    total_written: AtomicU64,

    /// Target writes that failed or panicked; the event is lost for that target only
    dropped_count: AtomicU64,

    /// Configuration reloads that replaced the active targets
    reparse_count: AtomicU64,

    /// Configuration reloads rejected; the previous targets stayed active
    reparse_failures: AtomicU64,

    /// Non-empty batches drained to asynchronous targets
    async_batches: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_written: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            reparse_count: AtomicU64::new(0),
            reparse_failures: AtomicU64::new(0),
            async_batches: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reparse_count(&self) -> u64 {
        self.reparse_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reparse_failures(&self) -> u64 {
        self.reparse_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn async_batches(&self) -> u64 {
        self.async_batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) {
        self.total_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed target write, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_reparse(&self) {
        self.reparse_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reparse_failure(&self) {
        self.reparse_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_async_batch(&self) {
        self.async_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Calculate the share of events that lost at least one target write (0.0 - 100.0)
    pub fn drop_rate(&self) -> f64 {
        let written = self.total_written();
        if written == 0 {
            return 0.0;
        }
        (self.dropped_count() as f64 / written as f64) * 100.0
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.total_written.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.reparse_count.store(0, Ordering::Relaxed);
        self.reparse_failures.store(0, Ordering::Relaxed);
        self.async_batches.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
