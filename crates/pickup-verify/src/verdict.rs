use pickup_anchor::{AuthorizationRecord, LedgerError, PickupRecord};
use pickup_batch::BatchError;
use pickup_types::{ErrorCategory, MerkleBatchData, TypeError};
use serde::{Deserialize, Serialize};

/// What the person in front of the screen should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Nothing to do.
    None,
    /// Outside its time window or not on the ledger yet.
    Wait,
    /// Tampered, forged, revoked or malformed; a new code or authorization
    /// is needed.
    Reissue,
    /// The ledger could not be reached; retry the same request.
    Retry,
}

/// Common surface of every verification result.
pub trait Verdict {
    fn is_valid(&self) -> bool;

    /// Failure category, `None` when valid.
    fn category(&self) -> Option<ErrorCategory>;

    fn recommended_action(&self) -> RecommendedAction;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorizationVerdict {
    Valid(AuthorizationRecord),
    /// Rejected before any hashing or ledger access.
    Malformed(TypeError),
    Expired,
    SignatureInvalid,
    NotFound,
    Revoked,
    LedgerUnavailable(LedgerError),
}

impl Verdict for AuthorizationVerdict {
    fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Valid(_) => None,
            Self::Malformed(_) => Some(ErrorCategory::Validation),
            Self::Expired | Self::SignatureInvalid => Some(ErrorCategory::Authentication),
            Self::NotFound | Self::LedgerUnavailable(_) => Some(ErrorCategory::Ledger),
            Self::Revoked => Some(ErrorCategory::Lifecycle),
        }
    }

    fn recommended_action(&self) -> RecommendedAction {
        match self {
            Self::Valid(_) => RecommendedAction::None,
            Self::Expired | Self::NotFound => RecommendedAction::Wait,
            Self::Malformed(_) | Self::SignatureInvalid | Self::Revoked => {
                RecommendedAction::Reissue
            }
            Self::LedgerUnavailable(_) => RecommendedAction::Retry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickupVerdict {
    Valid(PickupRecord),
    Malformed(TypeError),
    TooOld,
    ProofInvalid,
    NotFound,
    LedgerUnavailable(LedgerError),
}

impl Verdict for PickupVerdict {
    fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Valid(_) => None,
            Self::Malformed(_) => Some(ErrorCategory::Validation),
            Self::TooOld => Some(ErrorCategory::Authentication),
            Self::ProofInvalid => Some(ErrorCategory::Proof),
            Self::NotFound | Self::LedgerUnavailable(_) => Some(ErrorCategory::Ledger),
        }
    }

    fn recommended_action(&self) -> RecommendedAction {
        match self {
            Self::Valid(_) => RecommendedAction::None,
            Self::TooOld | Self::NotFound => RecommendedAction::Wait,
            Self::Malformed(_) | Self::ProofInvalid => RecommendedAction::Reissue,
            Self::LedgerUnavailable(_) => RecommendedAction::Retry,
        }
    }
}

/// Outcome of checking a full event set against its anchored batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchVerdict {
    Valid(MerkleBatchData),
    NotAnchored,
    Invalid(BatchError),
    LedgerUnavailable(LedgerError),
}

impl Verdict for BatchVerdict {
    fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Valid(_) => None,
            Self::NotAnchored | Self::LedgerUnavailable(_) => Some(ErrorCategory::Ledger),
            Self::Invalid(err) => Some(err.category()),
        }
    }

    fn recommended_action(&self) -> RecommendedAction {
        match self {
            Self::Valid(_) => RecommendedAction::None,
            Self::NotAnchored => RecommendedAction::Wait,
            Self::Invalid(_) => RecommendedAction::Reissue,
            Self::LedgerUnavailable(_) => RecommendedAction::Retry,
        }
    }
}
