//! Reads and molecular identifier groups (MIGs).
//!
//! A MIG is the set of reads sharing one UMI, presumed to derive from one template
//! molecule. Single-end and paired-end groups are modeled as a tagged union: a
//! paired MIG wraps two single-end MIGs that must agree on UMI and sample, checked
//! at construction.

use bstr::ByteSlice;

use crate::dna::reverse_complement;
use crate::errors::{FgmigError, Result};
use crate::umi::Umi;

/// A sequenced read: bases plus per-base Phred qualities of equal length.
///
/// Reads are owned exclusively by the MIG that contains them; assembly moves them
/// into the consensus output's assembled or dropped set.
#[derive(Clone, PartialEq, Eq)]
pub struct SeqRead {
    bases: Vec<u8>,
    quals: Vec<u8>,
}

impl SeqRead {
    /// Creates a read from bases and qualities.
    ///
    /// # Errors
    /// Returns [`FgmigError::LengthMismatch`] if the two vectors differ in length.
    pub fn new(bases: Vec<u8>, quals: Vec<u8>) -> Result<Self> {
        if bases.len() != quals.len() {
            return Err(FgmigError::LengthMismatch {
                sequence_len: bases.len(),
                quality_len: quals.len(),
            });
        }
        Ok(Self { bases, quals })
    }

    /// Returns the read's bases.
    #[inline]
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Returns the read's per-base qualities.
    #[inline]
    #[must_use]
    pub fn quals(&self) -> &[u8] {
        &self.quals
    }

    /// Returns the read length.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Returns true for a zero-length read.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Returns the reverse complement of this read: bases complemented and
    /// reversed, qualities reversed in step.
    #[must_use]
    pub fn reverse_complement(&self) -> Self {
        let bases = reverse_complement(&self.bases);
        let quals = self.quals.iter().rev().copied().collect();
        Self { bases, quals }
    }

    /// Truncates the read to `len` bases, keeping the 5' end.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.bases.truncate(len);
        self.quals.truncate(len);
    }
}

impl std::fmt::Debug for SeqRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqRead")
            .field("bases", &self.bases.as_bstr())
            .field("len", &self.len())
            .finish()
    }
}

/// A raw read pair as stored in the index, before re-orientation.
///
/// Which mate carries the anchoring barcode ("master") is recorded at extraction
/// time, along with any adapter boundaries detected on either mate. The pair is
/// turned into two same-strand reads by [`ReadPair::oriented`].
#[derive(Clone, Debug)]
pub struct ReadPair {
    /// First mate as sequenced.
    pub r1: SeqRead,
    /// Second mate as sequenced.
    pub r2: SeqRead,
    /// True when `r1` carries the master barcode; otherwise `r2` does.
    pub r1_master: bool,
    /// Adapter boundary on the master mate: keep bases `[0, n)`.
    pub master_trim: Option<usize>,
    /// Adapter boundary on the re-oriented slave mate: keep bases `[0, n)`.
    pub slave_trim: Option<usize>,
}

impl ReadPair {
    /// Re-orients the pair onto the master strand.
    ///
    /// The slave mate is reverse-complemented so both reads face the same strand,
    /// then each mate is truncated at its detected adapter boundary (if any).
    /// The transform is stateless and deterministic; it preserves base order on
    /// the master strand.
    #[must_use]
    pub fn oriented(self) -> (SeqRead, SeqRead) {
        let (mut master, slave) =
            if self.r1_master { (self.r1, self.r2) } else { (self.r2, self.r1) };
        let mut slave = slave.reverse_complement();

        if let Some(n) = self.master_trim {
            if n < master.len() {
                master.truncate(n);
            }
        }
        if let Some(n) = self.slave_trim {
            if n < slave.len() {
                slave.truncate(n);
            }
        }
        (master, slave)
    }
}

/// A single-end MIG: one UMI, one sample, an ordered collection of reads.
#[derive(Clone, Debug)]
pub struct SingleMig {
    umi: Umi,
    sample: String,
    reads: Vec<SeqRead>,
}

impl SingleMig {
    /// Creates a single-end MIG.
    #[must_use]
    pub fn new(umi: Umi, sample: impl Into<String>, reads: Vec<SeqRead>) -> Self {
        Self { umi, sample: sample.into(), reads }
    }

    /// Returns the group's UMI.
    #[inline]
    #[must_use]
    pub fn umi(&self) -> Umi {
        self.umi
    }

    /// Returns the sample this group belongs to.
    #[inline]
    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// Returns the reads in this group.
    #[inline]
    #[must_use]
    pub fn reads(&self) -> &[SeqRead] {
        &self.reads
    }

    /// Returns the group size (number of reads).
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.reads.len()
    }

    /// Consumes the MIG, yielding its reads.
    #[must_use]
    pub fn into_reads(self) -> Vec<SeqRead> {
        self.reads
    }
}

/// A paired-end MIG: two single-end MIGs with identical UMI and sample.
#[derive(Clone, Debug)]
pub struct PairedMig {
    first: SingleMig,
    second: SingleMig,
}

impl PairedMig {
    /// Pairs two single-end MIGs.
    ///
    /// # Errors
    /// Returns [`FgmigError::MigPairMismatch`] if the mates differ in UMI or
    /// sample — that indicates a bug in upstream grouping, not bad data.
    pub fn new(first: SingleMig, second: SingleMig) -> Result<Self> {
        if first.umi() != second.umi() {
            return Err(FgmigError::MigPairMismatch {
                reason: "UMIs differ".to_string(),
                first: first.umi().to_string(),
                second: second.umi().to_string(),
            });
        }
        if first.sample() != second.sample() {
            return Err(FgmigError::MigPairMismatch {
                reason: "samples differ".to_string(),
                first: first.sample().to_string(),
                second: second.sample().to_string(),
            });
        }
        Ok(Self { first, second })
    }

    /// Builds a paired MIG from mates already known to share UMI and sample.
    ///
    /// Used by the reader, which constructs both mates from a single index entry.
    pub(crate) fn from_parts(first: SingleMig, second: SingleMig) -> Self {
        debug_assert_eq!(first.umi(), second.umi());
        debug_assert_eq!(first.sample(), second.sample());
        Self { first, second }
    }

    /// Returns the master-strand mate.
    #[inline]
    #[must_use]
    pub fn first(&self) -> &SingleMig {
        &self.first
    }

    /// Returns the slave-strand mate.
    #[inline]
    #[must_use]
    pub fn second(&self) -> &SingleMig {
        &self.second
    }

    /// Consumes the pair, yielding both mates.
    #[must_use]
    pub fn into_parts(self) -> (SingleMig, SingleMig) {
        (self.first, self.second)
    }
}

/// A molecular identifier group: single-end or paired-end.
#[derive(Clone, Debug)]
pub enum Mig {
    /// Single-end group.
    Single(SingleMig),
    /// Paired-end group: two single-end payloads joined by a both-succeed rule
    /// at assembly time.
    Paired(PairedMig),
}

impl Mig {
    /// Returns the group's UMI.
    #[must_use]
    pub fn umi(&self) -> Umi {
        match self {
            Mig::Single(m) => m.umi(),
            Mig::Paired(p) => p.first().umi(),
        }
    }

    /// Returns the group size: reads for single-end, pairs for paired-end.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Mig::Single(m) => m.size(),
            Mig::Paired(p) => p.first().size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bases: &[u8], qual: u8) -> SeqRead {
        SeqRead::new(bases.to_vec(), vec![qual; bases.len()]).unwrap()
    }

    #[test]
    fn test_seq_read_length_check() {
        assert!(SeqRead::new(b"ACGT".to_vec(), vec![30; 4]).is_ok());
        let err = SeqRead::new(b"ACGT".to_vec(), vec![30; 3]).unwrap_err();
        assert!(matches!(err, FgmigError::LengthMismatch { sequence_len: 4, quality_len: 3 }));
    }

    #[test]
    fn test_seq_read_reverse_complement() {
        let r = SeqRead::new(b"AACGT".to_vec(), vec![10, 20, 30, 40, 50]).unwrap();
        let rc = r.reverse_complement();
        assert_eq!(rc.bases(), b"ACGTT");
        assert_eq!(rc.quals(), &[50, 40, 30, 20, 10]);
    }

    #[test]
    fn test_read_pair_orientation() {
        let pair = ReadPair {
            r1: read(b"ACGTACGT", 30),
            r2: read(b"TTTTGGGG", 25),
            r1_master: true,
            master_trim: None,
            slave_trim: None,
        };
        let (master, slave) = pair.oriented();
        assert_eq!(master.bases(), b"ACGTACGT");
        assert_eq!(slave.bases(), b"CCCCAAAA");
    }

    #[test]
    fn test_read_pair_orientation_swapped_master() {
        let pair = ReadPair {
            r1: read(b"AACG", 30),
            r2: read(b"GGCC", 30),
            r1_master: false,
            master_trim: None,
            slave_trim: None,
        };
        let (master, slave) = pair.oriented();
        assert_eq!(master.bases(), b"GGCC");
        assert_eq!(slave.bases(), b"CGTT");
    }

    #[test]
    fn test_read_pair_adapter_trim() {
        let pair = ReadPair {
            r1: read(b"ACGTACGTAC", 30),
            r2: read(b"TTTTTTTTTT", 30),
            r1_master: true,
            master_trim: Some(6),
            slave_trim: Some(4),
        };
        let (master, slave) = pair.oriented();
        assert_eq!(master.bases(), b"ACGTAC");
        assert_eq!(master.len(), 6);
        assert_eq!(slave.bases(), b"AAAA");
    }

    #[test]
    fn test_paired_mig_umi_mismatch() {
        let u1 = Umi::from_bytes(b"ACGT").unwrap();
        let u2 = Umi::from_bytes(b"TGCA").unwrap();
        let a = SingleMig::new(u1, "s1", vec![read(b"ACGT", 30)]);
        let b = SingleMig::new(u2, "s1", vec![read(b"ACGT", 30)]);
        let err = PairedMig::new(a, b).unwrap_err();
        assert!(matches!(err, FgmigError::MigPairMismatch { .. }));
    }

    #[test]
    fn test_paired_mig_sample_mismatch() {
        let u = Umi::from_bytes(b"ACGT").unwrap();
        let a = SingleMig::new(u, "s1", vec![read(b"ACGT", 30)]);
        let b = SingleMig::new(u, "s2", vec![read(b"ACGT", 30)]);
        assert!(PairedMig::new(a, b).is_err());
    }

    #[test]
    fn test_paired_mig_valid() {
        let u = Umi::from_bytes(b"ACGT").unwrap();
        let a = SingleMig::new(u, "s1", vec![read(b"ACGT", 30)]);
        let b = SingleMig::new(u, "s1", vec![read(b"TTTT", 30)]);
        let pair = PairedMig::new(a, b).unwrap();
        assert_eq!(pair.first().size(), 1);
        let mig = Mig::Paired(pair);
        assert_eq!(mig.size(), 1);
        assert_eq!(mig.umi(), u);
    }
}
