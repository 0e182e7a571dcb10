use pickup_crypto::SIGNATURE_WINDOW_SECS;
use serde::{Deserialize, Serialize};

/// One day, in seconds.
pub const AUTHORIZATION_WINDOW_SECS: u64 = 86_400;

/// Time tolerances applied by the verification engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Freshness tolerance for signatures and pickup events.
    pub signature_window: u64,
    /// Maximum distance between `now` and an authorization's start time.
    pub authorization_window: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            signature_window: SIGNATURE_WINDOW_SECS,
            authorization_window: AUTHORIZATION_WINDOW_SECS,
        }
    }
}
