use thiserror::Error;

use facegate_store::StoreError;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The persistent store failed or is unreachable. Surfaced to the
    /// caller immediately; nothing was committed.
    #[error("registry: {0}")]
    Store(#[from] StoreError),

    /// More than 999 distinct people share one name base. Enrollment is
    /// rejected; an operator must intervene.
    #[error("registry: suffix space exhausted for base {base}")]
    AllocationExhausted { base: String },

    /// An update path expected an identity that does not exist. Indicates an
    /// internal consistency bug, not a caller mistake.
    #[error("registry: unknown identity: {0}")]
    NotFound(String),

    /// Embedding length disagrees with the configured dimensionality.
    /// Rejected before any write.
    #[error("registry: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A name part the base derivation needs is missing.
    #[error("registry: invalid name: {0}")]
    InvalidName(String),
}
