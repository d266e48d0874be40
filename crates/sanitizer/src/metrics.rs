use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Counters describing what the sanitizer has done
#[derive(Debug, Default)]
pub struct SanitizerMetrics {
    /// Number of tokens passed through the sanitizer
    pub tokens_processed: AtomicUsize,
    /// Number of literal HTML tags degraded to text
    pub tags_degraded: AtomicUsize,
    /// Number of attributes examined
    pub attributes_processed: AtomicUsize,
    /// Number of attributes dropped from the output
    pub attributes_rejected: AtomicUsize,
    /// Number of attribute values rewritten (CSS, ids, URLs)
    pub values_rewritten: AtomicUsize,
}

/// Point-in-time copy of [`SanitizerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tokens_processed: usize,
    pub tags_degraded: usize,
    pub attributes_processed: usize,
    pub attributes_rejected: usize,
    pub values_rewritten: usize,
}

impl SanitizerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_tokens(&self) {
        self.tokens_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_degraded(&self) {
        self.tags_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_attributes(&self) {
        self.attributes_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.attributes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rewritten(&self) {
        self.values_rewritten.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tokens_processed: self.tokens_processed.load(Ordering::Relaxed),
            tags_degraded: self.tags_degraded.load(Ordering::Relaxed),
            attributes_processed: self.attributes_processed.load(Ordering::Relaxed),
            attributes_rejected: self.attributes_rejected.load(Ordering::Relaxed),
            values_rewritten: self.values_rewritten.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.tokens_processed.store(0, Ordering::Relaxed);
        self.tags_degraded.store(0, Ordering::Relaxed);
        self.attributes_processed.store(0, Ordering::Relaxed);
        self.attributes_rejected.store(0, Ordering::Relaxed);
        self.values_rewritten.store(0, Ordering::Relaxed);
    }
}

/// Timer for measuring a sanitization pass
#[derive(Debug)]
pub struct SanitizeTimer {
    start: Instant,
}

impl SanitizeTimer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    /// Elapsed time in microseconds
    pub fn elapsed_us(&self) -> u128 {
        self.start.elapsed().as_micros()
    }
}

impl Default for SanitizeTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_counters() {
        let metrics = SanitizerMetrics::new();

        metrics.increment_tokens();
        metrics.increment_tokens();
        metrics.increment_rejected();
        metrics.increment_rewritten();

        let snap = metrics.snapshot();
        assert_eq!(snap.tokens_processed, 2);
        assert_eq!(snap.attributes_rejected, 1);
        assert_eq!(snap.values_rewritten, 1);
        assert_eq!(snap.tags_degraded, 0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_thread_safety() {
        let metrics = Arc::new(SanitizerMetrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let metrics = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    metrics.increment_attributes();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().attributes_processed, 1000);
    }
}
