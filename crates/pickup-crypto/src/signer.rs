use std::fmt;

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use pickup_types::{within_window, Address, Digest};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hasher::keccak256;

/// Default tolerance between a signature's timestamp and "now", in seconds.
pub const SIGNATURE_WINDOW_SECS: u64 = 300;

/// secp256k1 signing key (private).
pub struct SigningKey(k256::ecdsa::SigningKey);

/// 65-byte recoverable signature: `r ‖ s ‖ v`, with `v` in `{27, 28}`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; 65]);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Ok(key) = k256::ecdsa::SigningKey::from_slice(&bytes) {
                return Self(key);
            }
        }
    }

    /// Create from a raw 32-byte secret scalar.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        k256::ecdsa::SigningKey::from_slice(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    /// Parse a hex-encoded secret, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = pickup_types::bytes::decode_fixed::<32>(s)
            .map_err(|_| SignatureError::InvalidKey)?;
        Self::from_bytes(bytes)
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        address_from_key(self.0.verifying_key())
    }

    /// Sign `message` as a personal message (EIP-191).
    pub fn sign_message(&self, message: &Digest) -> Result<RecoverableSignature, SignatureError> {
        let prehash = personal_message_hash(message.as_bytes());
        self.sign_prehash(&prehash)
    }

    /// Sign a 32-byte prehash directly.
    pub fn sign_prehash(&self, prehash: &Digest) -> Result<RecoverableSignature, SignatureError> {
        let (sig, recid) = self
            .0
            .sign_prehash_recoverable(prehash.as_bytes())
            .map_err(|_| SignatureError::SigningFailed)?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Ok(RecoverableSignature(out))
    }

    /// Raw secret key bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }
}

impl RecoverableSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let arr: [u8; 65] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// EIP-191 personal-message digest: `keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)`.
pub fn personal_message_hash(message: &[u8]) -> Digest {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut buf = Vec::with_capacity(prefix.len() + message.len());
    buf.extend_from_slice(prefix.as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Derive the account address of a public key: last 20 bytes of
/// `keccak256(x ‖ y)`.
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(address)
}

/// Recover the signer of a 32-byte prehash.
pub fn recover_prehash(prehash: &Digest, signature: &[u8]) -> Result<Address, SignatureError> {
    let sig = RecoverableSignature::from_slice(signature)?;
    let bytes = sig.as_bytes();

    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        0 | 1 => bytes[64],
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let recid = RecoveryId::from_byte(v).ok_or(SignatureError::InvalidRecoveryId(v))?;
    let ecdsa = EcdsaSignature::from_slice(&bytes[..64]).map_err(|_| SignatureError::InvalidFormat)?;

    // High-S signatures are malleable duplicates of a low-S one.
    if ecdsa.normalize_s().is_some() {
        return Err(SignatureError::MalleableSignature);
    }

    let key = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &ecdsa, recid)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_key(&key))
}

/// Recover the signer of a personal message.
pub fn recover_address(message: &Digest, signature: &[u8]) -> Result<Address, SignatureError> {
    recover_prehash(&personal_message_hash(message.as_bytes()), signature)
}

/// Check that `signature` over `message` was produced by `expected`.
pub fn verify_signature(
    message: &Digest,
    signature: &[u8],
    expected: &Address,
) -> Result<(), SignatureError> {
    let recovered = recover_address(message, signature)?;
    if recovered != *expected {
        return Err(SignatureError::SignerMismatch {
            expected: *expected,
            actual: recovered,
        });
    }
    Ok(())
}

/// Signature check combined with a freshness window.
///
/// Both must hold: the signature recovers to `expected`, and
/// `|now - timestamp| <= window`.
pub fn verify_signature_with_timestamp(
    message: &Digest,
    signature: &[u8],
    expected: &Address,
    timestamp: u64,
    now: u64,
    window: u64,
) -> Result<(), SignatureError> {
    if !within_window(now, timestamp, window) {
        return Err(SignatureError::OutsideWindow {
            timestamp,
            now,
            window,
        });
    }
    verify_signature(message, signature, expected)
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({}...)", hex::encode(&self.0[..8]))
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(pickup_types::bytes::strip_hex_prefix(&s))
            .map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Errors from signing and signature checks.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid key")]
    InvalidKey,

    #[error("signing failed")]
    SigningFailed,

    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature")]
    InvalidFormat,

    #[error("malleable signature (high S)")]
    MalleableSignature,

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signer mismatch: expected {expected}, recovered {actual}")]
    SignerMismatch { expected: Address, actual: Address },

    #[error("timestamp {timestamp} outside {window}s of {now}")]
    OutsideWindow { timestamp: u64, now: u64, window: u64 },
}

impl SignatureError {
    pub fn category(&self) -> pickup_types::ErrorCategory {
        match self {
            Self::InvalidLength(_) | Self::InvalidRecoveryId(_) | Self::InvalidFormat => {
                pickup_types::ErrorCategory::Validation
            }
            _ => pickup_types::ErrorCategory::Authentication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Digest {
        keccak256(b"pickup authorization")
    }

    #[test]
    fn sign_and_recover() {
        let sk = SigningKey::generate();
        let sig = sk.sign_message(&message()).unwrap();
        assert_eq!(recover_address(&message(), sig.as_bytes()).unwrap(), sk.address());
        assert!(verify_signature(&message(), sig.as_bytes(), &sk.address()).is_ok());
    }

    #[test]
    fn known_key_has_known_address() {
        // Secret 0x...01 is the generator point.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let sk = SigningKey::from_bytes(secret).unwrap();
        assert_eq!(
            sk.address().to_canonical(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn personal_message_prefix_matches_reference() {
        // keccak256("\x19Ethereum Signed Message:\n5hello")
        assert_eq!(
            personal_message_hash(b"hello").to_hex(),
            "0x50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[test]
    fn wrong_message_recovers_someone_else() {
        let sk = SigningKey::generate();
        let sig = sk.sign_message(&message()).unwrap();
        let other = keccak256(b"different");
        let err = verify_signature(&other, sig.as_bytes(), &sk.address()).unwrap_err();
        assert!(matches!(err, SignatureError::SignerMismatch { .. }));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign_message(&message()).unwrap();
        assert!(verify_signature(&message(), sig.as_bytes(), &sk2.address()).is_err());
    }

    #[test]
    fn rejects_bad_length_and_recovery_id() {
        assert_eq!(
            recover_address(&message(), &[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        );
        let sk = SigningKey::generate();
        let mut sig = sk.sign_message(&message()).unwrap().to_vec();
        sig[64] = 5;
        assert_eq!(
            recover_address(&message(), &sig),
            Err(SignatureError::InvalidRecoveryId(5))
        );
    }

    #[test]
    fn accepts_raw_recovery_id() {
        let sk = SigningKey::generate();
        let mut sig = sk.sign_message(&message()).unwrap().to_vec();
        sig[64] -= 27;
        assert_eq!(recover_address(&message(), &sig).unwrap(), sk.address());
    }

    #[test]
    fn timestamp_window_is_enforced() {
        let sk = SigningKey::generate();
        let sig = sk.sign_message(&message()).unwrap();
        let now = 1_700_000_000;
        let ok = |ts| {
            verify_signature_with_timestamp(
                &message(),
                sig.as_bytes(),
                &sk.address(),
                ts,
                now,
                SIGNATURE_WINDOW_SECS,
            )
        };
        assert!(ok(now).is_ok());
        assert!(ok(now - 300).is_ok());
        assert!(ok(now + 300).is_ok());
        assert!(matches!(ok(now - 301), Err(SignatureError::OutsideWindow { .. })));
        assert!(matches!(ok(now + 301), Err(SignatureError::OutsideWindow { .. })));
    }

    #[test]
    fn address_comparison_is_case_insensitive() {
        let sk = SigningKey::generate();
        let sig = sk.sign_message(&message()).unwrap();
        let shouted = sk.address().to_canonical().to_uppercase().replacen("0X", "0x", 1);
        let expected = Address::parse(&shouted).unwrap();
        assert!(verify_signature(&message(), sig.as_bytes(), &expected).is_ok());
    }

    #[test]
    fn key_hex_roundtrip() {
        let sk = SigningKey::generate();
        let hex = format!("0x{}", hex::encode(sk.to_bytes()));
        assert_eq!(SigningKey::from_hex(&hex).unwrap().address(), sk.address());
        assert_eq!(SigningKey::from_bytes([0u8; 32]).unwrap_err(), SignatureError::InvalidKey);
    }

    #[test]
    fn signature_serde_roundtrip() {
        let sk = SigningKey::generate();
        let sig = sk.sign_message(&message()).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let parsed: RecoverableSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn debug_redacts_signing_key() {
        let sk = SigningKey::generate();
        assert!(format!("{sk:?}").contains("redacted"));
    }
}
