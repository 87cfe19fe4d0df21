//! Shared metric plumbing.
//!
//! Each pipeline stage owns its serde-serializable counter struct
//! ([`crate::index::IndexingMetrics`], [`crate::consensus::AssemblyStats`],
//! [`crate::histogram::MigSizeDistribution`]); this module provides the summary
//! trait they share and the formatting helpers used in log output.

/// Common interface for metrics that track processing pipeline counts.
pub trait ProcessingMetrics {
    /// Total number of input items processed.
    fn total_input(&self) -> u64;

    /// Total number of items that survived to the stage's output.
    fn total_output(&self) -> u64;

    /// Total number of items filtered out or rejected.
    fn total_filtered(&self) -> u64;

    /// Processing efficiency as a percentage (output / input * 100).
    fn efficiency(&self) -> f64 {
        if self.total_input() == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let result = self.total_output() as f64 / self.total_input() as f64 * 100.0;
            result
        }
    }
}

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use fgmig_lib::metrics::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(123), "123");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let bytes = s.as_bytes();

    bytes
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).expect("digits are valid UTF-8"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Formats a fraction (0.0-1.0) as a percentage with the given decimal places.
///
/// # Examples
///
/// ```
/// use fgmig_lib::metrics::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(0.5, 1), "50.0%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(123), "123");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1.0, 0), "100%");
        assert_eq!(format_percent(0.125, 1), "12.5%");
    }

    #[test]
    fn test_efficiency() {
        use approx::assert_relative_eq;

        struct Fixed(u64, u64);
        impl ProcessingMetrics for Fixed {
            fn total_input(&self) -> u64 {
                self.0
            }
            fn total_output(&self) -> u64 {
                self.1
            }
            fn total_filtered(&self) -> u64 {
                self.0 - self.1
            }
        }
        assert_relative_eq!(Fixed(200, 150).efficiency(), 75.0);
        assert_relative_eq!(Fixed(0, 0).efficiency(), 0.0);
    }
}
