use pickup_types::{Digest, ErrorCategory};

/// Errors produced while assembling or validating a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("batch has {count} events, below the minimum of {min}")]
    BelowMinimum { count: usize, min: usize },

    #[error("batch has {count} events, above the maximum of {max}")]
    AboveMaximum { count: usize, max: usize },

    #[error("event count mismatch: claimed {claimed}, found {actual}")]
    CountMismatch { claimed: u64, actual: u64 },

    #[error("merkle root mismatch: claimed {claimed}, computed {computed}")]
    RootMismatch { claimed: Digest, computed: Digest },

    #[error("event {0} is already in the batch")]
    DuplicateEvent(Digest),

    #[error("event {0} is not a member of the batch")]
    UnknownLeaf(Digest),

    #[error("invalid event: {0}")]
    InvalidEvent(#[from] pickup_types::TypeError),

    #[error("batch number allocator unavailable: {0}")]
    Allocator(String),
}

impl BatchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RootMismatch { .. } | Self::CountMismatch { .. } | Self::UnknownLeaf(_) => {
                ErrorCategory::Proof
            }
            _ => ErrorCategory::Validation,
        }
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
