//! Progress tracking utilities.
//!
//! A thread-safe counter that logs through the `log` facade each time the count
//! crosses an interval boundary.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe progress tracker logging at regular intervals.
///
/// # Example
/// ```
/// use fgmig_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Indexed reads").with_interval(100);
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Indexed reads 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// Logging interval; progress is logged when the count crosses multiples.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Items counted so far.
    count: AtomicU64,
}

impl ProgressTracker {
    /// Creates a tracker with the given message prefix and a default interval
    /// of 100,000 items.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 100_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        assert!(interval > 0, "interval must be positive");
        self.interval = interval;
        self
    }

    /// Current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Adds `additional` items and logs once per interval boundary crossed.
    /// Safe to call from multiple threads.
    pub fn log_if_needed(&self, additional: u64) {
        if additional == 0 {
            return;
        }
        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;
        for crossed in (prev / self.interval + 1)..=(new_count / self.interval) {
            info!("{} {}", self.message, crossed * self.interval);
        }
    }

    /// Logs the final count unless it landed exactly on an interval boundary
    /// (in which case `log_if_needed` already reported it).
    pub fn log_final(&self) {
        let count = self.count.load(Ordering::Relaxed);
        if count % self.interval != 0 {
            info!("{} {} (complete)", self.message, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_count_accumulates() {
        let tracker = ProgressTracker::new("Items").with_interval(10);
        tracker.log_if_needed(7);
        tracker.log_if_needed(7);
        assert_eq!(tracker.count(), 14);
    }

    #[test]
    fn test_concurrent_increments() {
        let tracker = Arc::new(ProgressTracker::new("Items").with_interval(1000));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        tracker.log_if_needed(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(tracker.count(), 1000);
    }

    #[test]
    #[should_panic(expected = "interval must be positive")]
    fn test_zero_interval_rejected() {
        let _ = ProgressTracker::new("Items").with_interval(0);
    }
}
