use std::fmt;

use hmac::{Hmac, Mac};
use pickup_types::{Address, Digest};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::hasher::length_prefix;

type HmacSha256 = Hmac<Sha256>;

/// Keyed hash (HMAC-SHA256) for scan-code tokens.
///
/// Without the key a third party can neither forge a token hash nor link
/// two tokens to the same student.
#[derive(Clone)]
pub struct KeyedHasher {
    mac: HmacSha256,
}

impl KeyedHasher {
    /// Create a hasher from a secret key. Empty keys are rejected.
    pub fn new(key: &[u8]) -> Result<Self, KeyedHashError> {
        if key.is_empty() {
            return Err(KeyedHashError::EmptyKey);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| KeyedHashError::EmptyKey)?;
        Ok(Self { mac })
    }

    /// `HMAC(key, u64_be(len(student_id)) ‖ student_id ‖ pickup ‖ issued_at)`.
    pub fn token_hash(&self, student_id: &str, pickup: &Address, issued_at: u64) -> Digest {
        let mut mac = self.mac.clone();
        mac.update(&length_prefix(student_id.len()));
        mac.update(student_id.as_bytes());
        mac.update(pickup.as_bytes());
        mac.update(&issued_at.to_be_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Digest::from_hash(out)
    }
}

/// Constant-time digest equality.
pub fn digest_eq(a: &Digest, b: &Digest) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl fmt::Debug for KeyedHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyedHasher(<redacted>)")
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum KeyedHashError {
    #[error("keyed hash secret must not be empty")]
    EmptyKey,
}
