//! Custom error types for fgmig operations.
//!
//! Only configuration errors and structural invariant violations are modeled as
//! errors; attrition (dropped reads, skipped MIGs, rejected assemblies) is expected
//! and surfaces solely through metrics counters.

use thiserror::Error;

/// Result type alias for fgmig operations
pub type Result<T> = std::result::Result<T, FgmigError>;

/// Error type for fgmig operations
#[derive(Error, Debug)]
pub enum FgmigError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Invalid quality threshold
    #[error("Invalid quality threshold: {value} (must be between 0 and {max})")]
    InvalidQuality {
        /// The invalid quality value
        value: u8,
        /// Maximum valid value
        max: u8,
    },

    /// A read's sequence and quality strings differ in length
    #[error("Read sequence length {sequence_len} does not match quality length {quality_len}")]
    LengthMismatch {
        /// Length of the base sequence
        sequence_len: usize,
        /// Length of the quality string
        quality_len: usize,
    },

    /// A UMI sequence could not be encoded
    #[error("Invalid UMI '{umi}': {reason}")]
    InvalidUmi {
        /// The offending UMI sequence
        umi: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Two single-end MIGs were paired despite differing UMI or sample
    #[error("Cannot pair MIGs: {reason} (first: {first}, second: {second})")]
    MigPairMismatch {
        /// What differed between the mates
        reason: String,
        /// Identifier of the first mate
        first: String,
        /// Identifier of the second mate
        second: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter() {
        let error = FgmigError::InvalidParameter {
            parameter: "anchor-half-width".to_string(),
            reason: "must be >= 1".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid parameter 'anchor-half-width'"));
        assert!(msg.contains("must be >= 1"));
    }

    #[test]
    fn test_length_mismatch() {
        let error = FgmigError::LengthMismatch { sequence_len: 10, quality_len: 8 };
        let msg = format!("{error}");
        assert!(msg.contains("10"));
        assert!(msg.contains("8"));
    }

    #[test]
    fn test_mig_pair_mismatch() {
        let error = FgmigError::MigPairMismatch {
            reason: "UMIs differ".to_string(),
            first: "ACGT".to_string(),
            second: "TGCA".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Cannot pair MIGs"));
        assert!(msg.contains("UMIs differ"));
    }
}
