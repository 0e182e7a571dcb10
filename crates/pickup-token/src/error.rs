use pickup_crypto::{KeyedHashError, SignatureError};
use pickup_types::{ErrorCategory, TypeError};

/// Errors from the scan-code lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token {0} not found")]
    NotFound(String),

    #[error("token {0} has already been used")]
    AlreadyUsed(String),

    #[error("token {token_id} expired at {expires_at}")]
    Expired { token_id: String, expires_at: u64 },

    #[error("token {0} is inactive")]
    Inactive(String),

    #[error("scan code does not match token {0}")]
    HashMismatch(String),

    #[error("token {0} already exists")]
    DuplicateToken(String),

    #[error(transparent)]
    MalformedScanCode(#[from] TypeError),

    #[error("pickup signature rejected: {0}")]
    Signature(#[from] SignatureError),

    #[error("token secret rejected: {0}")]
    Secret(#[from] KeyedHashError),

    #[error("token ttl must be positive")]
    ZeroTtl,

    #[error("expiry overflows: issued at {issued_at} with ttl {ttl_secs}s")]
    ExpiryOverflow { issued_at: u64, ttl_secs: u64 },

    #[error("token store error: {0}")]
    Store(String),
}

impl TokenError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedScanCode(_)
            | Self::Secret(_)
            | Self::ZeroTtl
            | Self::ExpiryOverflow { .. } => ErrorCategory::Validation,
            Self::HashMismatch(_) => ErrorCategory::Authentication,
            Self::Signature(err) => err.category(),
            _ => ErrorCategory::Lifecycle,
        }
    }
}

pub type TokenResult<T> = Result<T, TokenError>;
