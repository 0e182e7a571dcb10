//! Commitment hashes, one function per entity kind.
//!
//! Field order is part of the commitment format and must not change.

use pickup_types::{Address, AuthorizationData, Digest, PickupEventData};

use crate::hasher::{DomainHasher, DomainTag};

/// Pseudonymize a student: tag + raw identifier.
pub fn student_hash(student_id: &str) -> Digest {
    DomainHasher::new(DomainTag::Student)
        .text(student_id)
        .finish()
}

/// The signature-free body of an authorization, which the guardian signs.
pub fn authorization_terms_hash(
    guardian: &Address,
    pickup: &Address,
    student_hash: &Digest,
    start_time: u64,
    end_time: u64,
) -> Digest {
    DomainHasher::new(DomainTag::AuthorizationTerms)
        .address(guardian)
        .address(pickup)
        .digest(student_hash)
        .uint(start_time)
        .uint(end_time)
        .finish()
}

/// Commitment to a complete authorization, signature included.
pub fn authorization_hash(auth: &AuthorizationData) -> Digest {
    DomainHasher::new(DomainTag::Authorization)
        .address(&auth.guardian)
        .address(&auth.pickup)
        .digest(&auth.student_hash)
        .uint(auth.start_time)
        .uint(auth.end_time)
        .bytes(auth.signature.as_slice())
        .finish()
}

/// Leaf hash of a pickup event.
pub fn pickup_event_hash(event: &PickupEventData) -> Digest {
    DomainHasher::new(DomainTag::PickupEvent)
        .digest(&event.student_hash)
        .address(&event.pickup)
        .address(&event.staff)
        .digest(&event.scan_code_hash)
        .uint(event.timestamp)
        .finish()
}

/// Commitment to a scan-code payload, stored as a pickup event's `scanCodeHash`.
pub fn scan_code_hash(
    token_id: &str,
    keyed_hash: &Digest,
    pickup: &Address,
    issued_at: u64,
) -> Digest {
    DomainHasher::new(DomainTag::ScanCode)
        .text(token_id)
        .digest(keyed_hash)
        .address(pickup)
        .uint(issued_at)
        .finish()
}

/// The message a signer attests to: who signs, over what, and when.
pub fn signature_hash(signer: &Address, subject: &Digest, timestamp: u64) -> Digest {
    DomainHasher::new(DomainTag::Signature)
        .address(signer)
        .digest(subject)
        .uint(timestamp)
        .finish()
}

/// The message a guardian signs to create `auth`.
pub fn authorization_signing_message(auth: &AuthorizationData) -> Digest {
    let terms = authorization_terms_hash(
        &auth.guardian,
        &auth.pickup,
        &auth.student_hash,
        auth.start_time,
        auth.end_time,
    );
    signature_hash(&auth.guardian, &terms, auth.start_time)
}
