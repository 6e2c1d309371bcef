use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe metrics for monitoring pipeline activity.
///
/// Uses atomic counters with `Relaxed` ordering since these are purely
/// statistical - no control flow depends on exact values, and eventual
/// visibility is acceptable for observability.
#[derive(Debug)]
pub struct Metrics {
    events_published: AtomicU64,
    events_processed: AtomicU64,
    publish_stalls: AtomicU64,
    handler_faults: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_published: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            publish_stalls: AtomicU64::new(0),
            handler_faults: AtomicU64::new(0),
        }
    }

    /// Increment events published counter.
    #[inline]
    pub fn add_events_published(&self, n: u64) {
        self.events_published.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment events processed counter (summed across consumers).
    #[inline]
    pub fn add_events_processed(&self, n: u64) {
        self.events_processed.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment publish stalls counter (producer gated by a slow consumer).
    #[inline]
    pub fn add_publish_stalls(&self, n: u64) {
        self.publish_stalls.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment handler faults counter.
    #[inline]
    pub fn add_handler_faults(&self, n: u64) {
        self.handler_faults.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a snapshot of current metrics values.
    ///
    /// Returns a plain struct with `u64` values that can be copied and compared.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            publish_stalls: self.publish_stalls.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics values.
///
/// This is a plain data struct (Copy, Clone) for easy use in aggregation and display.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub events_processed: u64,
    pub publish_stalls: u64,
    pub handler_faults: u64,
}
