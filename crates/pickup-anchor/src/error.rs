use pickup_types::{Digest, ErrorCategory};

/// Failures reported by the ledger contract or the path to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger contract is not deployed")]
    NotDeployed,

    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("{0} is already registered")]
    AlreadyRegistered(Digest),

    #[error("authorization {0} is not registered")]
    UnknownAuthorization(Digest),

    #[error("authorization {0} is already revoked")]
    AlreadyRevoked(Digest),

    #[error("batch number {number} does not follow latest anchored batch {latest}")]
    StaleBatchNumber { number: u64, latest: u64 },

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    #[error("ledger state error: {0}")]
    State(String),
}

impl LedgerError {
    /// Only transport failures are worth resubmitting unchanged; a reverted
    /// call will revert again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Whether the contract itself rejected the call.
    pub fn is_revert(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered(_)
                | Self::UnknownAuthorization(_)
                | Self::AlreadyRevoked(_)
                | Self::StaleBatchNumber { .. }
                | Self::Reverted(_)
        )
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Ledger
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_is_retryable() {
        assert!(LedgerError::Unreachable("timeout".into()).is_retryable());
        assert!(!LedgerError::NotDeployed.is_retryable());
        assert!(!LedgerError::AlreadyRegistered(Digest::zero()).is_retryable());
        assert!(!LedgerError::Reverted("x".into()).is_retryable());
    }

    #[test]
    fn reverts_are_classified() {
        assert!(LedgerError::StaleBatchNumber { number: 1, latest: 1 }.is_revert());
        assert!(!LedgerError::Unreachable("x".into()).is_revert());
        assert!(!LedgerError::NotDeployed.is_revert());
    }
}
