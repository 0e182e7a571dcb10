use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bytes::decode_fixed;
use crate::error::TypeError;

/// A 20-byte wallet-style account address.
///
/// Parsing accepts any hex case with or without `0x`; the canonical text
/// form is always lowercase and `0x`-prefixed. Equality is on the raw bytes,
/// so two spellings of the same address compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse and validate an address string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.trim().is_empty() {
            return Err(TypeError::MissingField("address"));
        }
        decode_fixed::<20>(s).map(Self)
    }

    /// Canonical lowercase `0x`-prefixed form.
    pub fn to_canonical(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Return the canonical form of an address string.
pub fn normalize_address(s: &str) -> Result<String, TypeError> {
    Address::parse(s).map(|a| a.to_canonical())
}

/// Whether a string is a well-formed address in any case.
pub fn is_valid_address(s: &str) -> bool {
    Address::parse(s).is_ok()
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_canonical())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl std::str::FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
