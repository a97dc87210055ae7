//! Error types for WRAITH.
//!
//! This module provides the error hierarchy for every crate in the workspace
//! using `thiserror`. Variants never carry key material: messages name the
//! failing field or record, not its contents.

use thiserror::Error;

/// Result type alias using `StealthError`.
pub type Result<T> = std::result::Result<T, StealthError>;

/// Main error type for all WRAITH operations.
#[derive(Debug, Error)]
pub enum StealthError {
    // ═══════════════════════════════════════════════════════════════════════════
    // KEY & RANDOMNESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The entropy source failed or could not yield a valid scalar.
    ///
    /// Fatal to the calling operation. Never retried with a weaker source.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// A public key is not a valid, non-identity secp256k1 point.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A private key is zero or not below the curve order.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to derive a stealth key or address.
    #[error("Stealth derivation failed: {0}")]
    StealthDerivationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // ADDRESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Invalid stealth meta-address format or content.
    #[error("Invalid meta-address: {0}")]
    InvalidMetaAddress(String),

    /// Invalid ledger address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // ANNOUNCEMENT LOG ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// A single log record could not be parsed or holds unusable data.
    ///
    /// Per-record: scans skip the record and surface it as an anomaly.
    #[error("Malformed announcement{}: {reason}", display_index(.sequence_index))]
    MalformedAnnouncement {
        /// Sequence index of the record, when it could be read.
        sequence_index: Option<u64>,
        /// What was wrong with the record.
        reason: String,
    },

    /// The announcement log backend failed.
    #[error("Announcement log error: {0}")]
    LogError(String),

    /// A feed channel was closed by its consumer.
    #[error("Announcement feed closed")]
    FeedClosed,

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Record or file format version mismatch.
    #[error("Format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build understands.
        expected: u8,
        /// Version found in the data.
        actual: u8,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

fn display_index(index: &Option<u64>) -> String {
    match index {
        Some(i) => format!(" #{i}"),
        None => String::new(),
    }
}

impl StealthError {
    /// Shorthand for a malformed record error.
    pub fn malformed(sequence_index: Option<u64>, reason: impl Into<String>) -> Self {
        StealthError::MalformedAnnouncement {
            sequence_index,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable (can retry).
    ///
    /// Key and randomness errors are never recoverable: the same input
    /// cannot succeed on retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StealthError::IoError(_) | StealthError::LogError(_))
    }

    /// Returns true if this error rejects caller-supplied key material.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            StealthError::InvalidPublicKey(_) | StealthError::InvalidPrivateKey(_)
        )
    }

    /// Returns true if the error concerns one log record rather than the call.
    pub fn is_per_record(&self) -> bool {
        matches!(self, StealthError::MalformedAnnouncement { .. })
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StealthError::ValidationError(_)
                | StealthError::InvalidMetaAddress(_)
                | StealthError::InvalidAddress(_)
                | StealthError::VersionMismatch { .. }
        )
    }
}
