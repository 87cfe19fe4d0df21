//! Sequential MIG read-out over a finished index.
//!
//! The reader is only valid once the index build and the size distribution have
//! fully completed for the sample: both the size threshold and the mismatch
//! decision need the complete distribution. That phase barrier is enforced by
//! construction — [`MigReader::new`] consumes the finished [`UmiIndex`] and
//! [`UmiCounts`].
//!
//! Each [`MigReader::next_mig`] call advances over the sample's UMIs in first-seen
//! order, drains the entry, and emits a [`Mig`] when the group passes the
//! caller-supplied size threshold and is not flagged by the mismatch oracle.
//! Skipped groups are counted, never retried, never surfaced as errors. The reader
//! holds `&mut self` state and must be externally synchronized if shared.

use crate::index::{MismatchOracle, UmiCounts, UmiIndex};
use crate::mig::{Mig, PairedMig, ReadPair, SeqRead, SingleMig};
use crate::umi::Umi;

/// Index payloads that can be turned into a MIG at read-out time.
pub trait MigPayload: Sized + Send {
    /// Builds the MIG for one drained index entry.
    fn into_mig(umi: Umi, sample: &str, items: Vec<Self>) -> Mig;
}

impl MigPayload for SeqRead {
    fn into_mig(umi: Umi, sample: &str, items: Vec<Self>) -> Mig {
        Mig::Single(SingleMig::new(umi, sample, items))
    }
}

impl MigPayload for ReadPair {
    /// Re-orients every pair onto the master strand (slave mate
    /// reverse-complemented, adapter trims applied), then splits the group into
    /// two same-UMI, same-sample single-end MIGs.
    fn into_mig(umi: Umi, sample: &str, items: Vec<Self>) -> Mig {
        let mut first = Vec::with_capacity(items.len());
        let mut second = Vec::with_capacity(items.len());
        for pair in items {
            let (master, slave) = pair.oriented();
            first.push(master);
            second.push(slave);
        }
        Mig::Paired(PairedMig::from_parts(
            SingleMig::new(umi, sample, first),
            SingleMig::new(umi, sample, second),
        ))
    }
}

/// Per-sample pull iterator over a finished index.
pub struct MigReader<P> {
    index: UmiIndex<P>,
    counts: UmiCounts,
    min_mismatch_ratio: f64,
    cursor: usize,
    skipped_small: u64,
    skipped_mismatch: u64,
}

impl<P: MigPayload> MigReader<P> {
    /// Creates a reader over a finished sample index.
    ///
    /// `min_mismatch_ratio` below 1 disables mismatch correction entirely.
    #[must_use]
    pub fn new(index: UmiIndex<P>, counts: UmiCounts, min_mismatch_ratio: f64) -> Self {
        Self { index, counts, min_mismatch_ratio, cursor: 0, skipped_small: 0, skipped_mismatch: 0 }
    }

    /// Returns the sample this reader serves.
    #[must_use]
    pub fn sample(&self) -> &str {
        self.index.sample()
    }

    /// Groups skipped so far for falling below the size threshold.
    #[must_use]
    pub fn skipped_small(&self) -> u64 {
        self.skipped_small
    }

    /// Groups skipped so far as likely mismatch echoes.
    #[must_use]
    pub fn skipped_mismatch(&self) -> u64 {
        self.skipped_mismatch
    }

    /// Returns the next MIG with at least `min_size` reads that is not flagged as
    /// a mismatch echo, or `None` once the sample is exhausted.
    ///
    /// Visited entries are drained from the index whether or not they are
    /// emitted, so a fully-read sample holds no read data.
    pub fn next_mig(&mut self, min_size: u64) -> Option<Mig> {
        loop {
            let umi = *self.index.order().get(self.cursor)?;
            self.cursor += 1;
            let Some(items) = self.index.take(&umi) else {
                continue;
            };
            if (items.len() as u64) < min_size {
                self.skipped_small += 1;
                continue;
            }
            let oracle = MismatchOracle::new(&self.counts, self.min_mismatch_ratio);
            if oracle.is_error_echo(&umi) {
                self.skipped_mismatch += 1;
                continue;
            }
            return Some(P::into_mig(umi, self.index.sample(), items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::UmiIndex;
    use crate::mig::SeqRead;

    fn read(bases: &[u8]) -> SeqRead {
        SeqRead::new(bases.to_vec(), vec![30; bases.len()]).unwrap()
    }

    fn single_end_index(groups: &[(&[u8], usize)]) -> (UmiIndex<SeqRead>, UmiCounts) {
        let mut index = UmiIndex::new("s1");
        let counts = UmiCounts::new();
        for &(umi_bytes, n) in groups {
            let umi = Umi::from_bytes(umi_bytes).unwrap();
            for _ in 0..n {
                index.push(umi, read(b"ACGTACGTACGT"));
                counts.increment(umi);
            }
        }
        (index, counts)
    }

    #[test]
    fn test_size_threshold_filters() {
        let (index, counts) = single_end_index(&[(b"AAAA", 5), (b"CCCC", 1), (b"GGGG", 3)]);
        let mut reader = MigReader::new(index, counts, 0.0);

        let first = reader.next_mig(3).unwrap();
        assert_eq!(first.umi().to_string(), "AAAA");
        assert_eq!(first.size(), 5);

        let second = reader.next_mig(3).unwrap();
        assert_eq!(second.umi().to_string(), "GGGG");

        assert!(reader.next_mig(3).is_none());
        assert_eq!(reader.skipped_small(), 1);
        assert_eq!(reader.skipped_mismatch(), 0);
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let (index, counts) = single_end_index(&[(b"AAAA", 2)]);
        let mut reader = MigReader::new(index, counts, 0.0);
        assert!(reader.next_mig(1).is_some());
        assert!(reader.next_mig(1).is_none());
        assert!(reader.next_mig(1).is_none());
    }

    #[test]
    fn test_mismatch_echo_skipped() {
        // CCCA is a Hamming-1 echo of a much larger CCCC group.
        let (index, counts) = single_end_index(&[(b"CCCC", 100), (b"CCCA", 2)]);
        let mut reader = MigReader::new(index, counts, 10.0);

        let first = reader.next_mig(1).unwrap();
        assert_eq!(first.umi().to_string(), "CCCC");
        assert!(reader.next_mig(1).is_none());
        assert_eq!(reader.skipped_mismatch(), 1);
    }

    #[test]
    fn test_mismatch_correction_disabled_by_low_ratio() {
        let (index, counts) = single_end_index(&[(b"CCCC", 100), (b"CCCA", 2)]);
        let mut reader = MigReader::new(index, counts, 0.5);
        assert!(reader.next_mig(1).is_some());
        assert!(reader.next_mig(1).is_some());
        assert_eq!(reader.skipped_mismatch(), 0);
    }

    #[test]
    fn test_paired_read_out_orients_slave() {
        let umi = Umi::from_bytes(b"ACGT").unwrap();
        let mut index: UmiIndex<ReadPair> = UmiIndex::new("s1");
        let counts = UmiCounts::new();
        index.push(
            umi,
            ReadPair {
                r1: read(b"ACGTACGT"),
                r2: read(b"AAAACCCC"),
                r1_master: true,
                master_trim: None,
                slave_trim: Some(6),
            },
        );
        counts.increment(umi);

        let mut reader = MigReader::new(index, counts, 0.0);
        let Some(Mig::Paired(pair)) = reader.next_mig(1) else {
            panic!("expected a paired MIG");
        };
        assert_eq!(pair.first().reads()[0].bases(), b"ACGTACGT");
        // Slave revcomp of AAAACCCC is GGGGTTTT, trimmed to 6 bases.
        assert_eq!(pair.second().reads()[0].bases(), b"GGGGTT");
        assert_eq!(pair.first().sample(), "s1");
    }
}
