use std::fmt;
use std::str::FromStr;

use pickup_crypto::digest_eq;
use pickup_types::{Address, Digest, TypeError};
use serde::{Deserialize, Serialize};

use crate::error::{TokenError, TokenResult};

/// A persisted scan-code authorization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationToken {
    pub token_id: String,
    pub keyed_hash: Digest,
    pub student_id: String,
    #[serde(rename = "pickupAddr")]
    pub pickup: Address,
    #[serde(rename = "guardianAddr")]
    pub guardian: Address,
    pub issued_at: u64,
    pub expires_at: u64,
    pub used: bool,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<u64>,
}

impl AuthorizationToken {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Check whether `supplied` may consume this token at `now`.
    ///
    /// A used token is reported as used before anything else, so a replay
    /// is recognizable as such even after expiry.
    pub fn check(&self, supplied: &Digest, now: u64) -> TokenResult<()> {
        if self.used {
            return Err(TokenError::AlreadyUsed(self.token_id.clone()));
        }
        if !self.active {
            return Err(TokenError::Inactive(self.token_id.clone()));
        }
        if self.is_expired(now) {
            return Err(TokenError::Expired {
                token_id: self.token_id.clone(),
                expires_at: self.expires_at,
            });
        }
        if !digest_eq(supplied, &self.keyed_hash) {
            return Err(TokenError::HashMismatch(self.token_id.clone()));
        }
        Ok(())
    }

    pub fn scan_code(&self) -> ScanCode {
        ScanCode {
            token_id: self.token_id.clone(),
            keyed_hash: self.keyed_hash,
        }
    }
}

/// What the guardian's device displays: `"<tokenId>|<keyedHash>"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanCode {
    pub token_id: String,
    pub keyed_hash: Digest,
}

impl ScanCode {
    /// Parse the wire form, splitting on the first `|`.
    pub fn parse(wire: &str) -> Result<Self, TypeError> {
        let (token_id, hash) = wire
            .trim()
            .split_once('|')
            .ok_or_else(|| TypeError::MalformedScanCode("missing '|' separator".into()))?;
        if token_id.is_empty() {
            return Err(TypeError::MalformedScanCode("empty token id".into()));
        }
        let keyed_hash = Digest::from_hex(hash)
            .map_err(|e| TypeError::MalformedScanCode(format!("bad hash: {e}")))?;
        Ok(Self {
            token_id: token_id.to_string(),
            keyed_hash,
        })
    }

    pub fn to_wire(&self) -> String {
        format!("{}|{}", self.token_id, self.keyed_hash.to_hex())
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for ScanCode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
