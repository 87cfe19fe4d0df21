//! MIG size distribution and the oversequencing threshold.
//!
//! After indexing completes, every UMI's group size is folded into a pair of
//! log2-binned histograms (MIG counts and read counts). The read-count peak drives
//! the per-sample oversequencing threshold; cumulative sums over the bins give the
//! retained/dropped projections for any candidate threshold.

use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};

use crate::index::UmiCounts;

/// Number of log2 bins; the last bin is a catch-all for sizes >= 2^(BIN_COUNT-1).
pub const BIN_COUNT: usize = 20;

/// Log2-binned histogram of MIG sizes for one sample.
///
/// Finalized only after the index build completes: per-UMI threshold and mismatch
/// decisions require the complete size distribution (a hard phase barrier, not a
/// streaming pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigSizeDistribution {
    /// MIGs per log2 size bin.
    migs_by_bin: Vec<u64>,
    /// Reads per log2 size bin.
    reads_by_bin: Vec<u64>,
    /// Total MIGs observed.
    total_migs: u64,
    /// Total reads observed.
    total_reads: u64,
}

impl Default for MigSizeDistribution {
    fn default() -> Self {
        Self {
            migs_by_bin: vec![0; BIN_COUNT],
            reads_by_bin: vec![0; BIN_COUNT],
            total_migs: 0,
            total_reads: 0,
        }
    }
}

impl MigSizeDistribution {
    /// Creates an empty distribution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a distribution from the finished per-UMI counters.
    #[must_use]
    pub fn from_counts(counts: &UmiCounts) -> Self {
        let mut dist = Self::new();
        counts.for_each(|_, size| dist.observe(size));
        dist
    }

    /// Returns the bin index for a group of `size` reads: `floor(log2(size))`,
    /// clamped to the last bin.
    #[inline]
    #[must_use]
    pub fn bin_for(size: u64) -> usize {
        debug_assert!(size >= 1);
        (size.ilog2() as usize).min(BIN_COUNT - 1)
    }

    /// Records one MIG of `size` reads. A size of zero is ignored (no group can
    /// be empty once a UMI has been observed).
    pub fn observe(&mut self, size: u64) {
        if size == 0 {
            return;
        }
        let bin = Self::bin_for(size);
        self.migs_by_bin[bin] += 1;
        self.reads_by_bin[bin] += size;
        self.total_migs += 1;
        self.total_reads += size;
    }

    /// Total number of MIGs observed.
    #[inline]
    #[must_use]
    pub fn total_migs(&self) -> u64 {
        self.total_migs
    }

    /// Total number of reads observed.
    #[inline]
    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    /// MIG counts per bin.
    #[must_use]
    pub fn migs_by_bin(&self) -> &[u64] {
        &self.migs_by_bin
    }

    /// Read counts per bin.
    #[must_use]
    pub fn reads_by_bin(&self) -> &[u64] {
        &self.reads_by_bin
    }

    /// Returns the bin holding the most reads, or `None` for an empty histogram.
    ///
    /// Ties resolve to the lowest bin index.
    #[must_use]
    pub fn peak_bin(&self) -> Option<usize> {
        if self.total_reads == 0 {
            return None;
        }
        let mut peak = 0;
        for (bin, &reads) in self.reads_by_bin.iter().enumerate() {
            if reads > self.reads_by_bin[peak] {
                peak = bin;
            }
        }
        Some(peak)
    }

    /// Derives the oversequencing threshold: `2^(p / 2)` for peak bin `p`
    /// (integer division), reflecting the assumption that true template depth
    /// scales as the square root of the observed duplication peak.
    ///
    /// An empty histogram has no peak and yields a threshold of 1, so every
    /// group passes.
    #[must_use]
    pub fn oversequencing_threshold(&self) -> u64 {
        match self.peak_bin() {
            None => 1,
            Some(p) => 1u64 << (p / 2),
        }
    }

    /// Returns `forced` when set, otherwise the histogram-derived threshold.
    #[must_use]
    pub fn threshold_or(&self, forced: Option<u64>) -> u64 {
        forced.unwrap_or_else(|| self.oversequencing_threshold())
    }

    /// Reads that would survive a size threshold of `threshold` (bin-resolution).
    #[must_use]
    pub fn reads_retained(&self, threshold: u64) -> u64 {
        self.reads_by_bin[Self::bin_for(threshold.max(1))..].iter().sum()
    }

    /// Reads that would be dropped at `threshold` (bin-resolution).
    #[must_use]
    pub fn reads_dropped(&self, threshold: u64) -> u64 {
        self.reads_by_bin[..Self::bin_for(threshold.max(1))].iter().sum()
    }

    /// MIGs that would survive a size threshold of `threshold` (bin-resolution).
    #[must_use]
    pub fn migs_retained(&self, threshold: u64) -> u64 {
        self.migs_by_bin[Self::bin_for(threshold.max(1))..].iter().sum()
    }

    /// MIGs that would be dropped at `threshold` (bin-resolution).
    #[must_use]
    pub fn migs_dropped(&self, threshold: u64) -> u64 {
        self.migs_by_bin[..Self::bin_for(threshold.max(1))].iter().sum()
    }

    /// Logs a one-line summary plus the nonzero bins.
    pub fn log_summary(&self, sample: &str) {
        info!(
            "Sample {}: {} MIGs over {} reads, oversequencing threshold {}",
            sample,
            self.total_migs,
            self.total_reads,
            self.oversequencing_threshold()
        );
        let bins = self
            .migs_by_bin
            .iter()
            .enumerate()
            .filter(|(_, &migs)| migs > 0)
            .map(|(bin, &migs)| format!("2^{bin}:{migs}"))
            .join(", ");
        if !bins.is_empty() {
            info!("MIG size bins (log2): {bins}");
        }
    }
}
