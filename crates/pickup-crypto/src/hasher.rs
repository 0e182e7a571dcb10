use pickup_types::{Address, Digest};
use sha3::{Digest as _, Keccak256};

/// Domain-separation tags, one per commitment kind.
///
/// The tag is packed ahead of every field so that structurally similar
/// inputs from different kinds can never produce the same preimage. New
/// kinds get a new variant; existing labels never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomainTag {
    Authorization,
    AuthorizationTerms,
    PickupEvent,
    Student,
    ScanCode,
    Signature,
}

impl DomainTag {
    pub const ALL: [DomainTag; 6] = [
        DomainTag::Authorization,
        DomainTag::AuthorizationTerms,
        DomainTag::PickupEvent,
        DomainTag::Student,
        DomainTag::ScanCode,
        DomainTag::Signature,
    ];

    /// The fixed ASCII label packed into the preimage.
    pub const fn label(&self) -> &'static str {
        match self {
            DomainTag::Authorization => "PICKUP_AUTHORIZATION_V1",
            DomainTag::AuthorizationTerms => "PICKUP_AUTHORIZATION_TERMS_V1",
            DomainTag::PickupEvent => "PICKUP_EVENT_V1",
            DomainTag::Student => "PICKUP_STUDENT_V1",
            DomainTag::ScanCode => "PICKUP_SCAN_CODE_V1",
            DomainTag::Signature => "PICKUP_SIGNATURE_V1",
        }
    }
}

/// Packs typed fields behind a domain tag and hashes them with Keccak-256.
///
/// Packing rules:
/// - the tag is written as a one-byte length followed by its label
/// - addresses are their 20 raw bytes, digests their 32 raw bytes
/// - integers are 8-byte big-endian
/// - variable-length byte fields carry an 8-byte big-endian length prefix
///
/// Every field has either a fixed width or an explicit length, so two
/// different field tuples cannot pack to the same bytes.
#[derive(Clone, Debug)]
pub struct DomainHasher {
    tag: DomainTag,
    buf: Vec<u8>,
}

impl DomainHasher {
    pub fn new(tag: DomainTag) -> Self {
        let label = tag.label().as_bytes();
        let mut buf = Vec::with_capacity(128);
        buf.push(label.len() as u8);
        buf.extend_from_slice(label);
        Self { tag, buf }
    }

    pub fn address(mut self, address: &Address) -> Self {
        self.buf.extend_from_slice(address.as_bytes());
        self
    }

    pub fn digest(mut self, digest: &Digest) -> Self {
        self.buf.extend_from_slice(digest.as_bytes());
        self
    }

    pub fn uint(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Length-prefixed variable-length field.
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.buf.extend_from_slice(&length_prefix(data.len()));
        self.buf.extend_from_slice(data);
        self
    }

    pub fn text(self, value: &str) -> Self {
        self.bytes(value.as_bytes())
    }

    /// The packed preimage so far.
    pub fn packed(&self) -> &[u8] {
        &self.buf
    }

    pub fn tag(&self) -> DomainTag {
        self.tag
    }

    pub fn finish(self) -> Digest {
        keccak256(&self.buf)
    }
}

/// Big-endian `u64` length of a variable-length field.
///
/// `usize` is at most 64 bits wide, so no field length can be truncated.
pub(crate) fn length_prefix(len: usize) -> [u8; 8] {
    (len as u64).to_be_bytes()
}

/// Raw Keccak-256 without domain separation.
pub fn keccak256(data: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    Digest::from_hash(hash)
}
