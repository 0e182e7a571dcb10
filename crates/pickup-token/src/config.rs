use std::fmt;

use pickup_crypto::SIGNATURE_WINDOW_SECS;
use serde::{Deserialize, Serialize};

/// Five minutes.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime of a scan code after issuance.
    pub ttl_secs: u64,
    /// Freshness tolerance for the pickup person's confirmation signature.
    pub signature_window: u64,
    /// HMAC key for token hashes. Never serialized back out.
    #[serde(skip_serializing)]
    pub secret: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            signature_window: SIGNATURE_WINDOW_SECS,
            secret: String::new(),
        }
    }
}

impl TokenConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("ttl_secs", &self.ttl_secs)
            .field("signature_window", &self.signature_window)
            .field("secret", &"<redacted>")
            .finish()
    }
}
