//! Error types for the Handoff domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Note that degraded
//! extraction is deliberately absent here: a heuristic that finds nothing is
//! reported through [`crate::StageStatus`] in package metadata, not as an error.

use crate::budget::Stage;
use thiserror::Error;

/// The top-level error type for all Handoff operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Run budget ---
    #[error("Deadline exceeded before stage {stage} ({elapsed_ms} ms elapsed)")]
    DeadlineExceeded { stage: Stage, elapsed_ms: u64 },

    // --- Input validation ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Signing ---
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the external signature provider.
///
/// These never invalidate an already computed checksum.
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("Signer unavailable: {0}")]
    Unavailable(String),

    #[error("Signing failed with key {key_id}: {reason}")]
    Failed { key_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_error_names_stage() {
        let err = Error::DeadlineExceeded {
            stage: Stage::Segmentation,
            elapsed_ms: 1200,
        };
        assert!(err.to_string().contains("segmentation"));
        assert!(err.to_string().contains("1200"));
    }

    #[test]
    fn signing_error_converts() {
        let err: Error = SigningError::Failed {
            key_id: "device-1".into(),
            reason: "secure enclave locked".into(),
        }
        .into();
        assert!(matches!(err, Error::Signing(_)));
        assert!(err.to_string().contains("device-1"));
    }
}
