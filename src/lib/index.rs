//! UMI indexing: the parallel build phase.
//!
//! Extraction of (UMI, payload) from each input record is CPU-bound and runs on a
//! bounded worker pool decoupled from the input iterator; the shared index map is
//! plain (non-thread-safe) and is mutated by exactly one aggregator — the calling
//! thread — consuming extraction results in arrival order. The per-UMI counter map
//! ([`UmiCounts`]) is the *only* structure mutated from multiple threads during the
//! pass; it seeds the size histogram and answers the mismatch oracle's neighbor
//! queries once the pass completes.

use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use ahash::AHashMap;
use crossbeam_channel::bounded;
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::{FgmigError, Result};
use crate::metrics::ProcessingMetrics;
use crate::phred::{PhredScore, MAX_PHRED};
use crate::progress::ProgressTracker;
use crate::umi::Umi;

/// Number of lock shards in [`UmiCounts`].
const SHARD_COUNT: usize = 16;

/// One successfully extracted input record: the UMI, its minimum base quality,
/// and the trimmed/oriented payload (a single read or a read pair).
pub struct ExtractedRead<P> {
    /// The UMI sequence.
    pub umi: Umi,
    /// Minimum Phred quality across the UMI's bases.
    pub umi_quality: PhredScore,
    /// The payload carried into the index.
    pub payload: P,
}

/// Upstream collaborator seam: turns a raw input record into a UMI-tagged payload.
///
/// Returning `None` marks the record as an extraction failure; such records are
/// silently excluded and only show up in the extraction-ratio diagnostic.
pub trait UmiExtractor<R>: Sync {
    /// Payload type stored in the index (e.g. [`crate::mig::SeqRead`] for
    /// single-end data, [`crate::mig::ReadPair`] for paired-end data).
    type Payload: Send;

    /// Extracts the UMI and payload from one record.
    fn extract(&self, record: R) -> Option<ExtractedRead<Self::Payload>>;
}

/// Configuration for the index build phase. Validated fail-fast.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Minimum acceptable UMI base quality; reads below are excluded and counted.
    pub min_umi_quality: PhredScore,
    /// Optional global read-count limit truncating the input stream early.
    pub read_limit: Option<u64>,
    /// Number of extraction worker threads.
    pub workers: usize,
    /// Capacity of the bounded record/result queues.
    pub queue_len: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self { min_umi_quality: 15, read_limit: None, workers, queue_len: 1024 }
    }
}

impl IndexerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error for a zero worker count, a zero queue
    /// length, or an out-of-range UMI quality.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FgmigError::InvalidParameter {
                parameter: "workers".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.queue_len == 0 {
            return Err(FgmigError::InvalidParameter {
                parameter: "queue-len".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.min_umi_quality > MAX_PHRED {
            return Err(FgmigError::InvalidQuality { value: self.min_umi_quality, max: MAX_PHRED });
        }
        Ok(())
    }
}

/// Per-sample UMI → payload index.
///
/// Single-writer during the build phase; afterwards handed to the reader, which
/// drains it entry by entry. First-seen UMI order is preserved so read-out order
/// is deterministic for a given input order.
pub struct UmiIndex<P> {
    sample: String,
    entries: AHashMap<Umi, Vec<P>>,
    order: Vec<Umi>,
    reads: u64,
}

impl<P> UmiIndex<P> {
    pub(crate) fn new(sample: impl Into<String>) -> Self {
        Self { sample: sample.into(), entries: AHashMap::new(), order: Vec::new(), reads: 0 }
    }

    pub(crate) fn push(&mut self, umi: Umi, payload: P) {
        match self.entries.entry(umi) {
            Entry::Occupied(mut e) => e.get_mut().push(payload),
            Entry::Vacant(v) => {
                self.order.push(umi);
                v.insert(vec![payload]);
            }
        }
        self.reads += 1;
    }

    /// Returns the sample this index belongs to.
    #[must_use]
    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// Number of distinct UMIs indexed.
    #[must_use]
    pub fn distinct_umis(&self) -> usize {
        self.entries.len()
    }

    /// Total payloads indexed.
    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.reads
    }

    /// Looks up the payloads for one UMI.
    #[must_use]
    pub fn get(&self, umi: &Umi) -> Option<&[P]> {
        self.entries.get(umi).map(Vec::as_slice)
    }

    /// Current group size for one UMI (zero once drained or never seen).
    #[must_use]
    pub fn size_of(&self, umi: &Umi) -> usize {
        self.entries.get(umi).map_or(0, Vec::len)
    }

    /// First-seen UMI order, driving the reader's iteration.
    pub(crate) fn order(&self) -> &[Umi] {
        &self.order
    }

    /// Removes and returns one UMI's payloads, releasing their memory share.
    pub(crate) fn take(&mut self, umi: &Umi) -> Option<Vec<P>> {
        self.entries.remove(umi)
    }
}

/// Thread-safe per-UMI read counters, sharded to limit lock contention.
///
/// This is the only concurrently-mutated structure during the index build; all
/// other maps are single-writer. After the build it is read-only: it seeds the
/// [`crate::histogram::MigSizeDistribution`] and backs [`MismatchOracle`]
/// neighbor lookups.
pub struct UmiCounts {
    shards: Vec<Mutex<AHashMap<Umi, u64>>>,
}

impl Default for UmiCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl UmiCounts {
    /// Creates an empty counter map.
    #[must_use]
    pub fn new() -> Self {
        Self { shards: (0..SHARD_COUNT).map(|_| Mutex::new(AHashMap::new())).collect() }
    }

    #[inline]
    fn shard_for(umi: &Umi) -> usize {
        // Fibonacci-hash the packed bits; the high bits are the best mixed.
        let mixed = umi.packed().wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (mixed >> 32) as usize % SHARD_COUNT
    }

    /// Adds one read to `umi`'s counter. Safe to call from any thread.
    pub fn increment(&self, umi: Umi) {
        let mut shard = self.shards[Self::shard_for(&umi)].lock();
        *shard.entry(umi).or_insert(0) += 1;
    }

    /// Returns the count for `umi`, zero if never seen.
    #[must_use]
    pub fn get(&self, umi: &Umi) -> u64 {
        self.shards[Self::shard_for(umi)].lock().get(umi).copied().unwrap_or(0)
    }

    /// Number of distinct UMIs counted.
    #[must_use]
    pub fn distinct(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().len() as u64).sum()
    }

    /// Visits every (UMI, count) pair, one shard at a time.
    pub fn for_each(&self, mut f: impl FnMut(Umi, u64)) {
        for shard in &self.shards {
            for (&umi, &count) in shard.lock().iter() {
                f(umi, count);
            }
        }
    }
}

/// Lazy post-index mismatch correction.
///
/// A UMI's group is "likely an error echo" of a larger group when some
/// single-substitution neighbor's group size exceeds `size × min_ratio`. A ratio
/// below 1 disables the check entirely. Each query costs O(UMI length × 3) counter
/// lookups and is evaluated once per UMI by the reader, never during indexing.
///
/// Only direct Hamming-1 neighbors are consulted; transitive chains (A↔B↔C) are
/// not collapsed.
pub struct MismatchOracle<'a> {
    counts: &'a UmiCounts,
    min_ratio: f64,
}

impl<'a> MismatchOracle<'a> {
    /// Creates an oracle over the finished counters.
    #[must_use]
    pub fn new(counts: &'a UmiCounts, min_ratio: f64) -> Self {
        Self { counts, min_ratio }
    }

    /// Whether correction is active (`min_ratio >= 1`).
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.min_ratio >= 1.0
    }

    /// Returns true when `umi`'s group should be discarded as a mismatch echo of
    /// some larger neighboring group. A UMI is never flagged against itself.
    #[must_use]
    pub fn is_error_echo(&self, umi: &Umi) -> bool {
        if !self.enabled() {
            return false;
        }
        let size = self.counts.get(umi);
        if size == 0 {
            return false;
        }
        let cutoff = size as f64 * self.min_ratio;
        umi.substitution_neighbors().any(|n| self.counts.get(&n) as f64 > cutoff)
    }
}

/// Diagnostics for one sample's index build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingMetrics {
    /// Sample name.
    pub sample: String,
    /// Records pulled from the input stream.
    pub total_records: u64,
    /// Records successfully extracted and indexed.
    pub extracted: u64,
    /// Records whose UMI extraction failed upstream.
    pub failed_extraction: u64,
    /// Records excluded for a UMI below the quality threshold.
    pub low_quality_umi: u64,
}

impl IndexingMetrics {
    /// Fraction of input records that made it into the index.
    #[must_use]
    pub fn extraction_ratio(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.extracted as f64 / self.total_records as f64;
            ratio
        }
    }
}

impl ProcessingMetrics for IndexingMetrics {
    fn total_input(&self) -> u64 {
        self.total_records
    }

    fn total_output(&self) -> u64 {
        self.extracted
    }

    fn total_filtered(&self) -> u64 {
        self.failed_extraction + self.low_quality_umi
    }
}

/// Builds per-sample UMI indexes on a bounded worker pool.
pub struct UmiIndexer {
    config: IndexerConfig,
}

impl UmiIndexer {
    /// Creates an indexer, validating the configuration.
    ///
    /// # Errors
    /// Propagates [`IndexerConfig::validate`] failures.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Indexes one sample's records in a single pass.
    ///
    /// The input iterator is fed to extraction workers through a bounded channel;
    /// the calling thread aggregates results in arrival order into the (plain,
    /// single-writer) index while workers bump the concurrent counters. Returns
    /// the finished index, the counters, and the build diagnostics. The returned
    /// values together unlock the next phase: histogram finalization and MIG
    /// read-out.
    pub fn build_index<R, I, E>(
        &self,
        sample: &str,
        records: I,
        extractor: &E,
    ) -> (UmiIndex<E::Payload>, UmiCounts, IndexingMetrics)
    where
        R: Send,
        I: IntoIterator<Item = R>,
        I::IntoIter: Send,
        E: UmiExtractor<R>,
    {
        let counts = UmiCounts::new();
        let total_records = AtomicU64::new(0);
        let failed_extraction = AtomicU64::new(0);
        let low_quality_umi = AtomicU64::new(0);
        let mut index = UmiIndex::new(sample);

        let (rec_tx, rec_rx) = bounded::<R>(self.config.queue_len);
        let (res_tx, res_rx) = bounded::<(Umi, E::Payload)>(self.config.queue_len);

        let read_limit = self.config.read_limit;
        let min_umi_quality = self.config.min_umi_quality;
        let records = records.into_iter();
        let progress = ProgressTracker::new("Indexed reads").with_interval(1_000_000);

        thread::scope(|s| {
            // Feeder: decouples input from CPU-bound extraction; owns the only
            // record sender so the channel closes when the input ends.
            {
                let total_records = &total_records;
                s.spawn(move || {
                    let mut sent = 0u64;
                    for record in records {
                        if read_limit.is_some_and(|limit| sent >= limit) {
                            break;
                        }
                        sent += 1;
                        total_records.fetch_add(1, Ordering::Relaxed);
                        if rec_tx.send(record).is_err() {
                            break;
                        }
                    }
                });
            }

            // Extraction workers: the only threads touching the counter map.
            for _ in 0..self.config.workers {
                let rec_rx = rec_rx.clone();
                let res_tx = res_tx.clone();
                let counts = &counts;
                let failed_extraction = &failed_extraction;
                let low_quality_umi = &low_quality_umi;
                s.spawn(move || {
                    for record in rec_rx {
                        match extractor.extract(record) {
                            None => {
                                failed_extraction.fetch_add(1, Ordering::Relaxed);
                            }
                            Some(x) if x.umi_quality < min_umi_quality => {
                                low_quality_umi.fetch_add(1, Ordering::Relaxed);
                            }
                            Some(x) => {
                                counts.increment(x.umi);
                                if res_tx.send((x.umi, x.payload)).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            drop(rec_rx);
            drop(res_tx);

            // Aggregator: exactly one writer for the index map, in arrival order.
            for (umi, payload) in res_rx {
                index.push(umi, payload);
                progress.log_if_needed(1);
            }
        });
        progress.log_final();

        let metrics = IndexingMetrics {
            sample: sample.to_string(),
            total_records: total_records.load(Ordering::Relaxed),
            extracted: index.total_reads(),
            failed_extraction: failed_extraction.load(Ordering::Relaxed),
            low_quality_umi: low_quality_umi.load(Ordering::Relaxed),
        };
        info!(
            "Sample {}: indexed {} of {} reads ({:.1}%) across {} UMIs",
            sample,
            metrics.extracted,
            metrics.total_records,
            metrics.extraction_ratio() * 100.0,
            index.distinct_umis()
        );
        (index, counts, metrics)
    }
}
