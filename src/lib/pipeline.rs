//! Assembly worker pools.
//!
//! Consensus assembly is embarrassingly parallel across MIGs: distinct groups
//! share no mutable state, so each worker owns its own
//! [`ConsensusAssembler`] and stats merge at the end. [`assemble_stream`] is the
//! intended production shape — one reader thread feeding workers through a
//! bounded queue that applies backpressure when full. [`assemble_collected`] is
//! a rayon convenience over MIGs already held in memory.
//!
//! Per-MIG output is deterministic, but completion order across workers is not;
//! callers needing a stable order sort on the consensus UMI.

use std::thread;

use crossbeam_channel::bounded;
use rayon::prelude::*;

use crate::consensus::{
    AssemblerConfig, AssemblyOutcome, AssemblyStats, Consensus, ConsensusAssembler,
};
use crate::errors::{FgmigError, Result};
use crate::reader::{MigPayload, MigReader};

/// Worker pool configuration. Validated fail-fast.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of assembler worker threads.
    pub threads: usize,
    /// Capacity of the bounded MIG/result queues.
    pub queue_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let threads = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self { threads, queue_len: 256 }
    }
}

impl PipelineConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error for a zero thread count or queue length.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(FgmigError::InvalidParameter {
                parameter: "threads".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.queue_len == 0 {
            return Err(FgmigError::InvalidParameter {
                parameter: "queue-len".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

enum WorkerMessage {
    Consensus(Consensus),
    Stats(AssemblyStats),
}

/// Drains a sample's reader through a bounded queue into a pool of assembler
/// workers, collecting every consensus and the merged stats.
///
/// The reader runs on its own thread and blocks when the queue is full, so
/// memory stays bounded however fast the index drains. There is no mid-MIG
/// cancellation: every MIG handed to a worker is fully assembled or rejected.
///
/// # Errors
/// Fails fast on invalid pipeline or assembler configuration; attrition during
/// assembly is never an error.
pub fn assemble_stream<P: MigPayload>(
    mut reader: MigReader<P>,
    min_size: u64,
    assembler_config: &AssemblerConfig,
    pipeline_config: &PipelineConfig,
) -> Result<(Vec<Consensus>, AssemblyStats)> {
    pipeline_config.validate()?;
    assembler_config.validate()?;
    let assemblers: Vec<ConsensusAssembler> = (0..pipeline_config.threads)
        .map(|_| ConsensusAssembler::from_validated(assembler_config.clone()))
        .collect();

    let (mig_tx, mig_rx) = bounded(pipeline_config.queue_len);
    let (out_tx, out_rx) = bounded(pipeline_config.queue_len);

    let mut consensuses = Vec::new();
    let mut stats = AssemblyStats::default();

    thread::scope(|s| {
        // Reader thread: the sole owner of the sequential per-sample iterator.
        s.spawn(move || {
            while let Some(mig) = reader.next_mig(min_size) {
                if mig_tx.send(mig).is_err() {
                    break;
                }
            }
        });

        for mut assembler in assemblers {
            let mig_rx = mig_rx.clone();
            let out_tx = out_tx.clone();
            s.spawn(move || {
                for mig in mig_rx {
                    if let AssemblyOutcome::Assembled(consensus) = assembler.assemble(mig) {
                        if out_tx.send(WorkerMessage::Consensus(consensus)).is_err() {
                            break;
                        }
                    }
                }
                let _ = out_tx.send(WorkerMessage::Stats(assembler.into_stats()));
            });
        }
        drop(mig_rx);
        drop(out_tx);

        for message in out_rx {
            match message {
                WorkerMessage::Consensus(consensus) => consensuses.push(consensus),
                WorkerMessage::Stats(worker_stats) => stats.merge(&worker_stats),
            }
        }
    });

    stats.log_summary();
    Ok((consensuses, stats))
}

/// Assembles an in-memory batch of MIGs on a rayon pool.
///
/// # Errors
/// Fails fast on invalid configuration or an unbuildable thread pool.
pub fn assemble_collected(
    migs: Vec<crate::mig::Mig>,
    assembler_config: &AssemblerConfig,
    threads: usize,
) -> Result<(Vec<Consensus>, AssemblyStats)> {
    assembler_config.validate()?;
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().map_err(|e| {
        FgmigError::InvalidParameter { parameter: "threads".to_string(), reason: e.to_string() }
    })?;

    let folded = pool.install(|| {
        migs.into_par_iter()
            .fold(
                || (Vec::new(), ConsensusAssembler::from_validated(assembler_config.clone())),
                |(mut out, mut assembler), mig| {
                    if let AssemblyOutcome::Assembled(consensus) = assembler.assemble(mig) {
                        out.push(consensus);
                    }
                    (out, assembler)
                },
            )
            .map(|(out, assembler)| (out, assembler.into_stats()))
            .reduce(
                || (Vec::new(), AssemblyStats::default()),
                |(mut out_a, mut stats_a), (out_b, stats_b)| {
                    out_a.extend(out_b);
                    stats_a.merge(&stats_b);
                    (out_a, stats_a)
                },
            )
    });
    Ok(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{UmiCounts, UmiIndex};
    use crate::mig::SeqRead;
    use crate::umi::Umi;

    const TEMPLATES: [&[u8]; 3] = [
        b"ACGTACGGTACCTTGACAGTCAGGATCCAGTCCATGCAGGCTTAACGGTCTAGGATCCAT",
        b"TTGACAGTCAGGATCCAGTCCATGCAGGCTTAACGGTCTAGGATCCATACGTACGGTACC",
        b"CAGGATCCAGTCCATGCAGGCTTAACGGTCTAGGATCCATACGTACGGTACCTTGACAGT",
    ];

    const UMIS: [&[u8]; 3] = [b"AAAACCCC", b"GGGGTTTT", b"ACACACAC"];

    fn reader_over_groups(copies: usize) -> MigReader<SeqRead> {
        let mut index = UmiIndex::new("s1");
        let counts = UmiCounts::new();
        for (umi_bytes, template) in UMIS.iter().zip(TEMPLATES.iter()) {
            let umi = Umi::from_bytes(umi_bytes).unwrap();
            for _ in 0..copies {
                let read = SeqRead::new(template.to_vec(), vec![35; template.len()]).unwrap();
                index.push(umi, read);
                counts.increment(umi);
            }
        }
        MigReader::new(index, counts, 0.0)
    }

    fn sorted_sequences(consensuses: &[Consensus]) -> Vec<(String, Vec<u8>)> {
        let mut out: Vec<(String, Vec<u8>)> = consensuses
            .iter()
            .map(|c| match c {
                Consensus::Single(s) => (s.umi().to_string(), s.bases().to_vec()),
                Consensus::Paired(p) => (p.first().umi().to_string(), p.first().bases().to_vec()),
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_stream_assembles_every_group() {
        let reader = reader_over_groups(8);
        let config = AssemblerConfig::default();
        let pipeline = PipelineConfig { threads: 3, queue_len: 4 };
        let (consensuses, stats) = assemble_stream(reader, 1, &config, &pipeline).unwrap();

        assert_eq!(consensuses.len(), 3);
        assert_eq!(stats.migs_processed, 3);
        assert_eq!(stats.consensuses_built, 3);
        assert_eq!(stats.reads_input, 24);
        assert_eq!(stats.reads_assembled, 24);

        let sequences = sorted_sequences(&consensuses);
        for (umi_bytes, template) in UMIS.iter().zip(TEMPLATES.iter()) {
            let umi = String::from_utf8(umi_bytes.to_vec()).unwrap();
            assert!(sequences.contains(&(umi, template.to_vec())));
        }
    }

    #[test]
    fn test_stream_matches_batch_assembly() {
        let mut reader = reader_over_groups(6);
        let mut migs = Vec::new();
        while let Some(mig) = reader.next_mig(1) {
            migs.push(mig);
        }
        let config = AssemblerConfig::default();

        let (batch, batch_stats) = assemble_collected(migs, &config, 2).unwrap();
        let reader = reader_over_groups(6);
        let (stream, stream_stats) =
            assemble_stream(reader, 1, &config, &PipelineConfig { threads: 2, queue_len: 2 })
                .unwrap();

        assert_eq!(sorted_sequences(&batch), sorted_sequences(&stream));
        assert_eq!(batch_stats.consensuses_built, stream_stats.consensuses_built);
        assert_eq!(batch_stats.reads_assembled, stream_stats.reads_assembled);
    }

    #[test]
    fn test_stream_applies_size_threshold() {
        let reader = reader_over_groups(2);
        let config = AssemblerConfig::default();
        let pipeline = PipelineConfig { threads: 2, queue_len: 2 };
        let (consensuses, stats) = assemble_stream(reader, 3, &config, &pipeline).unwrap();
        assert!(consensuses.is_empty());
        assert_eq!(stats.migs_processed, 0, "undersized groups never reach assembly");
    }

    #[test]
    fn test_pipeline_config_validation() {
        assert!(PipelineConfig { threads: 0, queue_len: 1 }.validate().is_err());
        assert!(PipelineConfig { threads: 1, queue_len: 0 }.validate().is_err());
        assert!(PipelineConfig { threads: 1, queue_len: 1 }.validate().is_ok());
    }
}
