//! Cryptographic primitives for the pickup integrity engine.
//!
//! Provides domain-separated Keccak-256 commitments, a sorted-pairing
//! binary Merkle tree with inclusion proofs, secp256k1 signing with address
//! recovery, and the HMAC keyed hash behind scan-code tokens.
//!
//! All crypto operations wrap established libraries. Nothing here performs
//! I/O or holds mutable shared state.

pub mod commitments;
pub mod hasher;
pub mod keyed;
pub mod merkle;
pub mod signer;

pub use commitments::{
    authorization_hash, authorization_signing_message, authorization_terms_hash,
    pickup_event_hash, scan_code_hash, signature_hash, student_hash,
};
pub use hasher::{keccak256, DomainHasher, DomainTag};
pub use keyed::{digest_eq, KeyedHashError, KeyedHasher};
pub use merkle::{hash_sorted_pair, verify_proof, MerkleProof, MerkleTree};
pub use signer::{
    recover_address, verify_signature, verify_signature_with_timestamp, RecoverableSignature,
    SignatureError, SigningKey, SIGNATURE_WINDOW_SECS,
};
