//! Offset-anchored frequency-matrix consensus assembly.
//!
//! Reads in a MIG are length-variable and offset relative to each other, so the
//! assembler first finds a shared anchor: every read's fixed-width window around
//! its midpoint is tallied across a small offset sweep, and the most frequent
//! window (ties to the smallest cumulative |offset|) becomes the alignment seed.
//! Each read is then placed at its best-Hamming offset against the seed, reads
//! that fit nowhere are dropped, and the survivors vote base-by-base into a
//! per-position frequency matrix. Low-confidence calls spread a quarter-unit
//! across all four bases instead of voting, so they can never dominate a
//! majority. An optional rescue pass evicts reads whose consecutive mismatches
//! around the anchor betray an indel misregistration.
//!
//! The anchoring step assumes no large indel spans the read midpoint; indels
//! elsewhere are tolerated by the offset sweep and the rescue pass. This is an
//! inherited limitation of the anchoring design, not a defect.

use ahash::AHashMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::consensus::types::{Consensus, MinorVariantSet, PairedConsensus, SingleConsensus};
use crate::dna::{base_code, BASES};
use crate::errors::{FgmigError, Result};
use crate::metrics::ProcessingMetrics;
use crate::mig::{Mig, SeqRead, SingleMig};
use crate::phred::{consensus_quality, PhredScore, MAX_CONSENSUS_QUAL, MAX_PHRED};

/// Configuration for consensus assembly. Validated fail-fast by
/// [`ConsensusAssembler::new`].
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Reads shorter than this are dropped before anchoring.
    pub min_read_length: usize,
    /// Half-width of the anchor window; the window spans `2 * half + 1` bases.
    pub anchor_half_width: usize,
    /// Anchor windows are probed at every offset in `[-radius, radius]`.
    pub offset_radius: usize,
    /// Reads whose best window mismatch count exceeds this are dropped.
    pub max_anchor_mismatches: u32,
    /// Reject the MIG when more than this fraction of reads is dropped.
    pub max_dropped_fraction: f64,
    /// Extend the consensus to the maximum read extent instead of the mean.
    pub greedy_extend: bool,
    /// Weight confident votes by their quality instead of one unit each.
    pub quality_weighted: bool,
    /// Base calls below this quality are treated as ambiguous.
    pub confident_quality: PhredScore,
    /// Enables the rescue pass: reads with more than this many consecutive
    /// mismatches against the provisional consensus near the anchor are evicted.
    pub rescue_max_consecutive: Option<usize>,
    /// Enables outside-in quality trimming of the final consensus at this bar.
    pub quality_trim: Option<PhredScore>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            min_read_length: 25,
            anchor_half_width: 8,
            offset_radius: 4,
            max_anchor_mismatches: 4,
            max_dropped_fraction: 0.3,
            greedy_extend: false,
            quality_weighted: false,
            confident_quality: 20,
            rescue_max_consecutive: None,
            quality_trim: None,
        }
    }
}

impl AssemblerConfig {
    /// Width of the anchor window in bases.
    #[must_use]
    pub fn window_width(&self) -> usize {
        2 * self.anchor_half_width + 1
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error for a zero-width anchor, a minimum read
    /// length too short to hold the window, an out-of-range dropped fraction or
    /// quality, or a zero rescue run length.
    pub fn validate(&self) -> Result<()> {
        if self.anchor_half_width == 0 {
            return Err(FgmigError::InvalidParameter {
                parameter: "anchor-half-width".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.min_read_length < self.window_width() {
            return Err(FgmigError::InvalidParameter {
                parameter: "min-read-length".to_string(),
                reason: format!(
                    "must be >= the anchor window width ({})",
                    self.window_width()
                ),
            });
        }
        if !self.max_dropped_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.max_dropped_fraction)
        {
            return Err(FgmigError::InvalidParameter {
                parameter: "max-dropped-fraction".to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if self.confident_quality > MAX_PHRED {
            return Err(FgmigError::InvalidQuality { value: self.confident_quality, max: MAX_PHRED });
        }
        if self.rescue_max_consecutive == Some(0) {
            return Err(FgmigError::InvalidParameter {
                parameter: "rescue-max-consecutive".to_string(),
                reason: "must be >= 1 when the rescue pass is enabled".to_string(),
            });
        }
        if let Some(bar) = self.quality_trim {
            if bar > MAX_CONSENSUS_QUAL {
                return Err(FgmigError::InvalidQuality { value: bar, max: MAX_CONSENSUS_QUAL });
            }
        }
        Ok(())
    }
}

/// Why an assembly was rejected. Rejections are expected attrition: counted,
/// never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Every read was dropped by the length or anchor filters.
    NoUsableReads,
    /// The short+anchor dropped fraction exceeded the configured maximum.
    ExcessiveDroppedReads,
    /// Quality trimming left an empty sequence.
    EmptyAfterTrim,
    /// In paired mode, the other mate's single-end assembly failed.
    MateRejected,
}

impl RejectionReason {
    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoUsableReads => "No reads survived the length and anchor filters",
            Self::ExcessiveDroppedReads => "Too large a fraction of reads was dropped",
            Self::EmptyAfterTrim => "Quality trimming left an empty consensus",
            Self::MateRejected => "The paired mate's assembly failed",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Counters for one assembler's lifetime; mergeable across worker threads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// MIGs handed to `assemble`.
    pub migs_processed: u64,
    /// MIGs that produced a consensus.
    pub consensuses_built: u64,
    /// MIGs rejected.
    pub migs_rejected: u64,
    /// Reads entering assembly.
    pub reads_input: u64,
    /// Reads contributing to a final matrix.
    pub reads_assembled: u64,
    /// Reads dropped for falling below the minimum length.
    pub reads_short_dropped: u64,
    /// Reads dropped for exceeding the anchor mismatch cap.
    pub reads_anchor_dropped: u64,
    /// Reads evicted by the rescue pass.
    pub reads_rescue_dropped: u64,
    /// Rejections with no usable reads.
    pub rejected_no_usable: u64,
    /// Rejections for an excessive dropped fraction.
    pub rejected_excess_dropped: u64,
    /// Rejections for an empty post-trim consensus.
    pub rejected_empty_after_trim: u64,
    /// Paired rejections where a mate failed.
    pub rejected_mate: u64,
}

impl AssemblyStats {
    /// Folds another stats block into this one.
    pub fn merge(&mut self, other: &AssemblyStats) {
        self.migs_processed += other.migs_processed;
        self.consensuses_built += other.consensuses_built;
        self.migs_rejected += other.migs_rejected;
        self.reads_input += other.reads_input;
        self.reads_assembled += other.reads_assembled;
        self.reads_short_dropped += other.reads_short_dropped;
        self.reads_anchor_dropped += other.reads_anchor_dropped;
        self.reads_rescue_dropped += other.reads_rescue_dropped;
        self.rejected_no_usable += other.rejected_no_usable;
        self.rejected_excess_dropped += other.rejected_excess_dropped;
        self.rejected_empty_after_trim += other.rejected_empty_after_trim;
        self.rejected_mate += other.rejected_mate;
    }

    fn record_rejection(&mut self, reason: RejectionReason) {
        match reason {
            RejectionReason::NoUsableReads => self.rejected_no_usable += 1,
            RejectionReason::ExcessiveDroppedReads => self.rejected_excess_dropped += 1,
            RejectionReason::EmptyAfterTrim => self.rejected_empty_after_trim += 1,
            RejectionReason::MateRejected => self.rejected_mate += 1,
        }
    }

    /// Logs a summary of the counters.
    pub fn log_summary(&self) {
        info!(
            "Assembled {} of {} MIGs ({} rejected); reads: {} in, {} assembled, {} short, \
             {} anchor-dropped, {} rescue-dropped",
            self.consensuses_built,
            self.migs_processed,
            self.migs_rejected,
            self.reads_input,
            self.reads_assembled,
            self.reads_short_dropped,
            self.reads_anchor_dropped,
            self.reads_rescue_dropped
        );
    }
}

impl ProcessingMetrics for AssemblyStats {
    fn total_input(&self) -> u64 {
        self.reads_input
    }

    fn total_output(&self) -> u64 {
        self.reads_assembled
    }

    fn total_filtered(&self) -> u64 {
        self.reads_short_dropped + self.reads_anchor_dropped + self.reads_rescue_dropped
    }
}

/// The result of one `assemble` call.
#[derive(Debug)]
pub enum AssemblyOutcome {
    /// A consensus was built.
    Assembled(Consensus),
    /// The MIG was rejected; the reason has been counted.
    Rejected(RejectionReason),
}

impl AssemblyOutcome {
    /// Returns the consensus, discarding a rejection.
    #[must_use]
    pub fn consensus(self) -> Option<Consensus> {
        match self {
            AssemblyOutcome::Assembled(c) => Some(c),
            AssemblyOutcome::Rejected(_) => None,
        }
    }
}

/// A surviving read anchored against the seed: `start` is the index of the
/// anchor window's first base within the read.
struct AnchoredRead {
    read: SeqRead,
    start: usize,
}

/// Per-window tally during seed selection.
struct WindowTally {
    count: u32,
    offset_sum: u64,
    first_seen: u32,
}

/// Offset-anchored consensus assembler.
///
/// Assembly of distinct MIGs shares no mutable state, so each worker thread owns
/// its own assembler; stats merge afterwards.
pub struct ConsensusAssembler {
    config: AssemblerConfig,
    stats: AssemblyStats,
}

impl ConsensusAssembler {
    /// Creates an assembler, validating the configuration.
    ///
    /// # Errors
    /// Propagates [`AssemblerConfig::validate`] failures.
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Builds an assembler from a configuration the caller has already
    /// validated (e.g. once per pipeline rather than once per worker).
    pub(crate) fn from_validated(config: AssemblerConfig) -> Self {
        Self { config, stats: AssemblyStats::default() }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &AssemblyStats {
        &self.stats
    }

    /// Consumes the assembler, yielding its counters.
    #[must_use]
    pub fn into_stats(self) -> AssemblyStats {
        self.stats
    }

    /// Collapses one MIG into a consensus, or rejects it.
    ///
    /// Paired MIGs run the single-end algorithm independently per mate and
    /// require both to succeed. Identical input (same reads, same order) yields
    /// byte-identical output.
    pub fn assemble(&mut self, mig: Mig) -> AssemblyOutcome {
        self.stats.migs_processed += 1;
        match mig {
            Mig::Single(mate) => match self.assemble_single(mate) {
                Ok(c) => {
                    self.stats.consensuses_built += 1;
                    AssemblyOutcome::Assembled(Consensus::Single(c))
                }
                Err(reason) => {
                    self.stats.migs_rejected += 1;
                    self.stats.record_rejection(reason);
                    AssemblyOutcome::Rejected(reason)
                }
            },
            Mig::Paired(pair) => {
                let (first, second) = pair.into_parts();
                match (self.assemble_single(first), self.assemble_single(second)) {
                    (Ok(a), Ok(b)) => {
                        self.stats.consensuses_built += 1;
                        AssemblyOutcome::Assembled(Consensus::Paired(PairedConsensus::new(a, b)))
                    }
                    (first_result, second_result) => {
                        for reason in
                            [first_result.err(), second_result.err()].into_iter().flatten()
                        {
                            self.stats.record_rejection(reason);
                        }
                        self.stats.migs_rejected += 1;
                        AssemblyOutcome::Rejected(RejectionReason::MateRejected)
                    }
                }
            }
        }
    }

    /// Runs the single-end algorithm over one mate.
    fn assemble_single(
        &mut self,
        mig: SingleMig,
    ) -> std::result::Result<SingleConsensus, RejectionReason> {
        let umi = mig.umi();
        let sample = mig.sample().to_string();
        let reads = mig.into_reads();
        let input_count = reads.len();
        self.stats.reads_input += input_count as u64;
        if input_count == 0 {
            return Err(RejectionReason::NoUsableReads);
        }

        // Step 1: length filter.
        let mut dropped: Vec<SeqRead> = Vec::new();
        let mut surviving: Vec<SeqRead> = Vec::new();
        for read in reads {
            if read.len() < self.config.min_read_length {
                dropped.push(read);
            } else {
                surviving.push(read);
            }
        }
        self.stats.reads_short_dropped += dropped.len() as u64;
        if surviving.is_empty() {
            return Err(RejectionReason::NoUsableReads);
        }

        // Steps 2-3: seed selection.
        let Some(seed) = self.select_seed(&surviving) else {
            return Err(RejectionReason::NoUsableReads);
        };

        // Step 4: anchor every read against the seed; drop poor fits.
        let mut kept: Vec<AnchoredRead> = Vec::with_capacity(surviving.len());
        let mut anchor_dropped = 0u64;
        for read in surviving {
            match self.anchor_read(&read, &seed) {
                Some(start) => kept.push(AnchoredRead { read, start }),
                None => {
                    anchor_dropped += 1;
                    dropped.push(read);
                }
            }
        }
        self.stats.reads_anchor_dropped += anchor_dropped;

        #[allow(clippy::cast_precision_loss)]
        let dropped_fraction = dropped.len() as f64 / input_count as f64;
        if dropped_fraction > self.config.max_dropped_fraction {
            return Err(RejectionReason::ExcessiveDroppedReads);
        }
        if kept.is_empty() {
            return Err(RejectionReason::NoUsableReads);
        }

        // Step 5: consensus extents left/right of the anchor window.
        let window = self.config.window_width();
        let (left, right) = self.extents(&kept, window);
        let span = left + window + right;

        // Step 6: frequency matrix.
        let mut matrix = vec![[0.0f64; 4]; span];
        for anchored in &kept {
            self.accumulate(&mut matrix, anchored, left, 1.0);
        }

        // Step 7: rescue pass.
        if let Some(max_consecutive) = self.config.rescue_max_consecutive {
            let evicted =
                self.rescue_pass(&mut matrix, &mut kept, left, window, max_consecutive);
            self.stats.reads_rescue_dropped += evicted.len() as u64;
            dropped.extend(evicted);
            if kept.is_empty() {
                return Err(RejectionReason::NoUsableReads);
            }
        }

        // Step 8: majority call per position with a monotonic CQS.
        let mut codes: Vec<u8> = Vec::with_capacity(span);
        let mut quals: Vec<PhredScore> = Vec::with_capacity(span);
        for column in &matrix {
            let code = majority_code(column);
            let total: f64 = column.iter().sum();
            codes.push(code);
            quals.push(consensus_quality(column[code as usize], total));
        }

        let (trim_start, trim_end) = match self.config.quality_trim {
            None => (0, span),
            Some(bar) => {
                let start = quals.iter().position(|&q| q >= bar);
                match start {
                    None => return Err(RejectionReason::EmptyAfterTrim),
                    Some(start) => {
                        let end =
                            quals.iter().rposition(|&q| q >= bar).map_or(span, |i| i + 1);
                        (start, end)
                    }
                }
            }
        };

        // Step 9: minor variants over the retained span.
        let mut minors = MinorVariantSet::default();
        for anchored in &kept {
            self.collect_minors(&mut minors, anchored, left, &codes, trim_start, trim_end);
        }

        self.stats.reads_assembled += kept.len() as u64;
        let bases: Vec<u8> = codes[trim_start..trim_end]
            .iter()
            .map(|&code| BASES[code as usize])
            .collect();
        let quals = quals[trim_start..trim_end].to_vec();
        let assembled: Vec<SeqRead> = kept.into_iter().map(|a| a.read).collect();
        Ok(SingleConsensus::new(umi, sample, bases, quals, assembled, dropped, minors))
    }

    /// Steps 2-3: tallies every read's midpoint window across the offset sweep
    /// and picks the most frequent one; ties go to the smallest cumulative
    /// |offset|, then to the earliest observation, so the choice is
    /// deterministic for a given read order.
    fn select_seed(&self, reads: &[SeqRead]) -> Option<Vec<u8>> {
        let window = self.config.window_width();
        let half = self.config.anchor_half_width;
        let mut tallies: AHashMap<Vec<u8>, WindowTally> = AHashMap::new();
        let mut seen = 0u32;

        for read in reads {
            for offset in offsets(self.config.offset_radius) {
                let Some(start) = window_start(read.len(), half, window, offset) else {
                    continue;
                };
                let sequence = &read.bases()[start..start + window];
                if let Some(tally) = tallies.get_mut(sequence) {
                    tally.count += 1;
                    tally.offset_sum += offset.unsigned_abs() as u64;
                } else {
                    tallies.insert(
                        sequence.to_vec(),
                        WindowTally {
                            count: 1,
                            offset_sum: offset.unsigned_abs() as u64,
                            first_seen: seen,
                        },
                    );
                    seen += 1;
                }
            }
        }

        let mut best: Option<(&Vec<u8>, &WindowTally)> = None;
        for (sequence, tally) in &tallies {
            let better = match best {
                None => true,
                Some((_, current)) => {
                    tally.count > current.count
                        || (tally.count == current.count
                            && (tally.offset_sum < current.offset_sum
                                || (tally.offset_sum == current.offset_sum
                                    && tally.first_seen < current.first_seen)))
                }
            };
            if better {
                best = Some((sequence, tally));
            }
        }
        best.map(|(sequence, _)| sequence.clone())
    }

    /// Step 4: finds the window start minimizing Hamming distance to the seed,
    /// probing offsets by increasing |offset| with an exact-match short-circuit.
    /// Returns `None` when the best distance exceeds the mismatch cap.
    fn anchor_read(&self, read: &SeqRead, seed: &[u8]) -> Option<usize> {
        let window = self.config.window_width();
        let half = self.config.anchor_half_width;
        let cap = self.config.max_anchor_mismatches;
        let mut best: Option<(u32, usize)> = None;

        for offset in offsets(self.config.offset_radius) {
            let Some(start) = window_start(read.len(), half, window, offset) else {
                continue;
            };
            let limit = best.map_or(cap, |(mm, _)| mm.max(cap));
            let mm = hamming_capped(&read.bases()[start..start + window], seed, limit);
            if mm == 0 {
                return Some(start);
            }
            if best.map_or(true, |(current, _)| mm < current) {
                best = Some((mm, start));
            }
        }

        match best {
            Some((mm, start)) if mm <= cap => Some(start),
            _ => None,
        }
    }

    /// Step 5: how far the consensus extends beyond the anchor window on each
    /// side — the max over kept reads in greedy mode, the floored mean otherwise.
    fn extents(&self, kept: &[AnchoredRead], window: usize) -> (usize, usize) {
        let lefts = kept.iter().map(|a| a.start);
        let rights = kept.iter().map(|a| a.read.len() - a.start - window);
        if self.config.greedy_extend {
            (lefts.max().unwrap_or(0), rights.max().unwrap_or(0))
        } else {
            let n = kept.len();
            let left_sum: usize = lefts.sum();
            let right_sum: usize = rights.sum();
            (left_sum / n, right_sum / n)
        }
    }

    /// Step 6 (and its exact inverse for the rescue pass): one read's
    /// contribution to the matrix. Confident A/C/G/T calls vote one unit (or
    /// their quality, in quality-weighted mode) for their base; everything else
    /// — low-quality calls, non-ACGT bases, and padding outside the read's
    /// extent — spreads exactly a quarter-unit over all four bases, never
    /// renormalized.
    fn accumulate(&self, matrix: &mut [[f64; 4]], anchored: &AnchoredRead, left: usize, sign: f64) {
        let bases = anchored.read.bases();
        let quals = anchored.read.quals();
        for (pos, column) in matrix.iter_mut().enumerate() {
            let idx = pos as isize - left as isize + anchored.start as isize;
            let confident = if idx >= 0 && (idx as usize) < bases.len() {
                let idx = idx as usize;
                match base_code(bases[idx]) {
                    Some(code) if quals[idx] >= self.config.confident_quality => {
                        Some((code, quals[idx]))
                    }
                    _ => None,
                }
            } else {
                None
            };
            match confident {
                Some((code, qual)) => {
                    let weight =
                        if self.config.quality_weighted { f64::from(qual) } else { 1.0 };
                    column[code as usize] += sign * weight;
                }
                None => {
                    for cell in column.iter_mut() {
                        *cell += sign * 0.25;
                    }
                }
            }
        }
    }

    /// Step 7: evicts reads whose run of consecutive mismatches against the
    /// provisional consensus, within the anchor window ± the offset radius,
    /// exceeds `max_consecutive` — the signature of an indel misregistration.
    /// Evicted reads have their matrix contribution subtracted exactly.
    fn rescue_pass(
        &self,
        matrix: &mut [[f64; 4]],
        kept: &mut Vec<AnchoredRead>,
        left: usize,
        window: usize,
        max_consecutive: usize,
    ) -> Vec<SeqRead> {
        let span = matrix.len();
        let provisional: Vec<u8> = matrix.iter().map(|column| majority_code(column)).collect();
        let margin_start = left.saturating_sub(self.config.offset_radius);
        let margin_end = (left + window + self.config.offset_radius).min(span);

        let mut evicted = Vec::new();
        let mut index = 0;
        while index < kept.len() {
            let anchored = &kept[index];
            let bases = anchored.read.bases();
            let mut run = 0usize;
            let mut max_run = 0usize;
            for pos in margin_start..margin_end {
                let idx = pos as isize - left as isize + anchored.start as isize;
                let mismatch = idx >= 0
                    && (idx as usize) < bases.len()
                    && matches!(base_code(bases[idx as usize]), Some(code) if code != provisional[pos]);
                if mismatch {
                    run += 1;
                    max_run = max_run.max(run);
                } else {
                    // Matches, ambiguous calls, and coverage gaps all break the run.
                    run = 0;
                }
            }
            if max_run > max_consecutive {
                let anchored = kept.remove(index);
                self.accumulate(matrix, &anchored, left, -1.0);
                evicted.push(anchored.read);
            } else {
                index += 1;
            }
        }
        evicted
    }

    /// Step 9: confident calls disagreeing with the majority become minor
    /// variants, recorded with the supporting read's quality at that position.
    fn collect_minors(
        &self,
        minors: &mut MinorVariantSet,
        anchored: &AnchoredRead,
        left: usize,
        codes: &[u8],
        trim_start: usize,
        trim_end: usize,
    ) {
        let bases = anchored.read.bases();
        let quals = anchored.read.quals();
        for pos in trim_start..trim_end {
            let idx = pos as isize - left as isize + anchored.start as isize;
            if idx < 0 || (idx as usize) >= bases.len() {
                continue;
            }
            let idx = idx as usize;
            if quals[idx] < self.config.confident_quality {
                continue;
            }
            if let Some(code) = base_code(bases[idx]) {
                if code != codes[pos] {
                    minors.record(pos - trim_start, BASES[code as usize], quals[idx]);
                }
            }
        }
    }
}

/// Probes offsets in order of increasing magnitude: 0, -1, 1, -2, 2, ...
fn offsets(radius: usize) -> impl Iterator<Item = isize> {
    #[allow(clippy::cast_possible_wrap)]
    let radius = radius as isize;
    std::iter::once(0).chain((1..=radius).flat_map(|r| [-r, r]))
}

/// Start index of the window centered at the read midpoint shifted by `offset`,
/// or `None` when the window would overrun the read.
fn window_start(len: usize, half: usize, window: usize, offset: isize) -> Option<usize> {
    #[allow(clippy::cast_possible_wrap)]
    let start = (len / 2) as isize - half as isize + offset;
    if start < 0 {
        return None;
    }
    let start = start as usize;
    (start + window <= len).then_some(start)
}

/// Hamming distance, short-circuiting once the count exceeds `limit` (the exact
/// value above the limit is irrelevant to both best-offset tracking and the cap).
fn hamming_capped(a: &[u8], b: &[u8], limit: u32) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    let mut mismatches = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x != y {
            mismatches += 1;
            if mismatches > limit {
                return mismatches;
            }
        }
    }
    mismatches
}

/// Index of the heaviest base in a matrix column; ties go to the lowest code.
fn majority_code(column: &[f64; 4]) -> u8 {
    let mut best = 0usize;
    for code in 1..4 {
        if column[code] > column[best] {
            best = code;
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    let code = best as u8;
    code
}
