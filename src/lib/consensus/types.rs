//! Consensus output types.
//!
//! A [`SingleConsensus`] is the collapsed representation of one single-end MIG:
//! the derived sequence, per-position qualities, the reads that built it, the
//! reads that were dropped along the way, and the multiset of minor variants kept
//! for downstream error modeling. Paired-end assembly wraps two single-end
//! payloads. Consensus objects are ephemeral: one per successful `assemble` call,
//! consumed by downstream alignment/variant calling, never persisted here.

use std::collections::BTreeMap;

use bstr::ByteSlice;

use crate::mig::SeqRead;
use crate::phred::PhredScore;
use crate::umi::Umi;

/// Minor variants: base calls present in individual reads but not promoted to
/// majority, keyed by (consensus position, base) with the supporting read
/// qualities.
///
/// Backed by an ordered map so iteration (and therefore serialized output) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinorVariantSet {
    inner: BTreeMap<(u32, u8), Vec<PhredScore>>,
}

impl MinorVariantSet {
    /// Records one supporting observation.
    pub(crate) fn record(&mut self, position: usize, base: u8, quality: PhredScore) {
        #[allow(clippy::cast_possible_truncation)]
        let key = (position as u32, base);
        self.inner.entry(key).or_default().push(quality);
    }

    /// Number of reads supporting `base` at `position`.
    #[must_use]
    pub fn count(&self, position: usize, base: u8) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        let key = (position as u32, base);
        self.inner.get(&key).map_or(0, Vec::len)
    }

    /// Number of distinct (position, base) variants.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.inner.len()
    }

    /// Total supporting observations across all variants.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// True when no minor variant was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates variants in (position, base) order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u8, &[PhredScore])> {
        self.inner.iter().map(|(&(pos, base), quals)| (pos as usize, base, quals.as_slice()))
    }

    /// Keeps variants inside `[start, end)` and re-bases positions to `start`.
    pub(crate) fn rebased(&self, start: usize, end: usize) -> Self {
        let inner = self
            .inner
            .iter()
            .filter(|(&(pos, _), _)| (pos as usize) >= start && (pos as usize) < end)
            .map(|(&(pos, base), quals)| ((pos - start as u32, base), quals.clone()))
            .collect();
        Self { inner }
    }
}

/// The consensus over one single-end MIG.
#[derive(Debug, Clone)]
pub struct SingleConsensus {
    umi: Umi,
    sample: String,
    bases: Vec<u8>,
    quals: Vec<PhredScore>,
    assembled: Vec<SeqRead>,
    dropped: Vec<SeqRead>,
    minors: MinorVariantSet,
}

impl SingleConsensus {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        umi: Umi,
        sample: String,
        bases: Vec<u8>,
        quals: Vec<PhredScore>,
        assembled: Vec<SeqRead>,
        dropped: Vec<SeqRead>,
        minors: MinorVariantSet,
    ) -> Self {
        debug_assert_eq!(bases.len(), quals.len());
        Self { umi, sample, bases, quals, assembled, dropped, minors }
    }

    /// The group's UMI.
    #[must_use]
    pub fn umi(&self) -> Umi {
        self.umi
    }

    /// The sample the group belongs to.
    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// The consensus sequence.
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Per-position consensus quality scores.
    #[must_use]
    pub fn quals(&self) -> &[PhredScore] {
        &self.quals
    }

    /// Consensus length in bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True for a zero-length consensus.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Reads that contributed to the final matrix.
    #[must_use]
    pub fn assembled_reads(&self) -> &[SeqRead] {
        &self.assembled
    }

    /// Reads dropped during assembly (too short, anchor mismatch, rescue).
    #[must_use]
    pub fn dropped_reads(&self) -> &[SeqRead] {
        &self.dropped
    }

    /// The minor variant multiset.
    #[must_use]
    pub fn minors(&self) -> &MinorVariantSet {
        &self.minors
    }

    /// Trims low-quality positions from both ends, strictly outside-in.
    ///
    /// Scanning inward from each end stops at the first position whose quality
    /// meets `min_quality`; interior low-quality runs are never removed. Minor
    /// variant positions are re-based onto the trimmed span and variants outside
    /// it are dropped. Trimming an output that already starts and ends at
    /// passing positions is a no-op, so the operation is idempotent.
    #[must_use]
    pub fn quality_trimmed(self, min_quality: PhredScore) -> Self {
        let start = self.quals.iter().position(|&q| q >= min_quality);
        let Some(start) = start else {
            // Nothing passes the bar: the trimmed consensus is empty.
            return Self {
                bases: Vec::new(),
                quals: Vec::new(),
                minors: MinorVariantSet::default(),
                ..self
            };
        };
        // Safe: `position` succeeded, so some position passes.
        let end = self.quals.iter().rposition(|&q| q >= min_quality).map_or(0, |i| i + 1);
        if start == 0 && end == self.quals.len() {
            return self;
        }
        let minors = self.minors.rebased(start, end);
        Self {
            bases: self.bases[start..end].to_vec(),
            quals: self.quals[start..end].to_vec(),
            minors,
            ..self
        }
    }
}

impl std::fmt::Display for SingleConsensus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} {}", self.sample, self.umi, self.bases.as_bstr())
    }
}

/// The consensus over one paired-end MIG: both mates assembled independently and
/// both required to succeed.
#[derive(Debug, Clone)]
pub struct PairedConsensus {
    first: SingleConsensus,
    second: SingleConsensus,
}

impl PairedConsensus {
    pub(crate) fn new(first: SingleConsensus, second: SingleConsensus) -> Self {
        debug_assert_eq!(first.umi(), second.umi());
        debug_assert_eq!(first.sample(), second.sample());
        Self { first, second }
    }

    /// Master-strand consensus.
    #[must_use]
    pub fn first(&self) -> &SingleConsensus {
        &self.first
    }

    /// Slave-strand consensus.
    #[must_use]
    pub fn second(&self) -> &SingleConsensus {
        &self.second
    }

    /// Consumes the pair, yielding both consensuses.
    #[must_use]
    pub fn into_parts(self) -> (SingleConsensus, SingleConsensus) {
        (self.first, self.second)
    }
}

/// A consensus, single-end or paired-end, mirroring the MIG tagged union.
#[derive(Debug, Clone)]
pub enum Consensus {
    /// Single-end consensus.
    Single(SingleConsensus),
    /// Paired-end consensus.
    Paired(PairedConsensus),
}

impl Consensus {
    /// The group's UMI.
    #[must_use]
    pub fn umi(&self) -> Umi {
        match self {
            Consensus::Single(c) => c.umi(),
            Consensus::Paired(p) => p.first().umi(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(quals: &[PhredScore]) -> SingleConsensus {
        let bases = vec![b'A'; quals.len()];
        SingleConsensus::new(
            Umi::from_bytes(b"ACGT").unwrap(),
            "s1".to_string(),
            bases,
            quals.to_vec(),
            Vec::new(),
            Vec::new(),
            MinorVariantSet::default(),
        )
    }

    #[test]
    fn test_trim_removes_low_quality_ends_only() {
        let c = consensus(&[2, 5, 30, 4, 35, 6, 2]);
        let trimmed = c.quality_trimmed(20);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed.quals(), &[30, 4, 35], "interior low quality survives");
    }

    #[test]
    fn test_retrim_is_noop() {
        let c = consensus(&[2, 5, 30, 4, 35, 6, 2]);
        let once = c.quality_trimmed(20);
        let twice = once.clone().quality_trimmed(20);
        assert_eq!(once.bases(), twice.bases());
        assert_eq!(once.quals(), twice.quals());
        assert_eq!(once.minors(), twice.minors());
    }

    #[test]
    fn test_trim_everything_yields_empty() {
        let c = consensus(&[2, 3, 4]);
        let trimmed = c.quality_trimmed(20);
        assert!(trimmed.is_empty());
        assert!(trimmed.minors().is_empty());
    }

    #[test]
    fn test_trim_rebases_minors() {
        let mut minors = MinorVariantSet::default();
        minors.record(0, b'C', 30); // trimmed away
        minors.record(3, b'G', 25); // survives at position 1
        let c = SingleConsensus::new(
            Umi::from_bytes(b"ACGT").unwrap(),
            "s1".to_string(),
            b"AAAAA".to_vec(),
            vec![2, 2, 30, 30, 2],
            Vec::new(),
            Vec::new(),
            minors,
        );
        let trimmed = c.quality_trimmed(20);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed.minors().count(1, b'G'), 1);
        assert_eq!(trimmed.minors().distinct(), 1);
    }

    #[test]
    fn test_minor_set_multiset_semantics() {
        let mut minors = MinorVariantSet::default();
        for q in [30, 31, 32] {
            minors.record(7, b'T', q);
        }
        minors.record(9, b'C', 28);
        assert_eq!(minors.count(7, b'T'), 3);
        assert_eq!(minors.count(7, b'C'), 0);
        assert_eq!(minors.distinct(), 2);
        assert_eq!(minors.total(), 4);
        let collected: Vec<(usize, u8)> = minors.iter().map(|(p, b, _)| (p, b)).collect();
        assert_eq!(collected, vec![(7, b'T'), (9, b'C')]);
    }
}
