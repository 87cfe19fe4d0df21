//! Consensus assembly for molecular identifier groups.
//!
//! The [`assembler`] module holds the offset-anchored frequency-matrix algorithm
//! that collapses a MIG into a single high-confidence sequence; [`types`] holds
//! the consensus output model, including the minor variant multiset and
//! outside-in quality trimming.

pub mod assembler;
pub mod types;

// Re-export commonly used items
pub use assembler::{
    AssemblerConfig, AssemblyOutcome, AssemblyStats, ConsensusAssembler, RejectionReason,
};
pub use types::{Consensus, MinorVariantSet, PairedConsensus, SingleConsensus};
