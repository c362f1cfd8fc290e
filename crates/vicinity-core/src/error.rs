//! Error types for Vicinity.
//!
//! A single unified error enum covers every fallible operation. Error codes
//! follow the pattern `VIC-XXX` so callers and logs can match on a stable
//! identifier independent of the message text.

use thiserror::Error;

/// Result type alias for Vicinity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Vicinity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid build or search configuration (VIC-001).
    #[error("[VIC-001] Invalid configuration: {0}")]
    Config(String),

    /// Insert with an id that is already live (VIC-002).
    #[error("[VIC-002] Id {0} already exists")]
    DuplicateId(u64),

    /// Vector dimension does not match the index (VIC-003).
    #[error("[VIC-003] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// CSR input violates the format contract (VIC-004).
    #[error("[VIC-004] Malformed sparse input: {0}")]
    MalformedSparseInput(String),

    /// Remove or lookup on an absent or tombstoned id (VIC-005).
    #[error("[VIC-005] Id {0} not found")]
    NotFound(u64),

    /// Corrupt or truncated snapshot (VIC-006).
    #[error("[VIC-006] Serialization error: {0}")]
    Serialization(String),

    /// IO error (VIC-007).
    #[error("[VIC-007] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the stable error code (e.g., "VIC-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "VIC-001",
            Self::DuplicateId(_) => "VIC-002",
            Self::DimensionMismatch { .. } => "VIC-003",
            Self::MalformedSparseInput(_) => "VIC-004",
            Self::NotFound(_) => "VIC-005",
            Self::Serialization(_) => "VIC-006",
            Self::Io(_) => "VIC-007",
        }
    }
}
