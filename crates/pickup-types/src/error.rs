use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing or validating engine inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: u64, end: u64 },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("malformed scan code: {0}")]
    MalformedScanCode(String),
}

/// Coarse failure taxonomy shared by every engine entry point.
///
/// Surfaces map each category to a different user action: validation and
/// lifecycle failures need a new code, authentication failures mean the
/// request is stale or forged, ledger failures can be retried, and proof
/// failures indicate tampering or a stale batch reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Ledger,
    Proof,
    Lifecycle,
}

impl ErrorCategory {
    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger)
    }
}

impl TypeError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}
