//! Plain records handed to the engine by the application layer.
//!
//! Each record is its own wire payload: serde uses the camelCase field names
//! of the external interface, addresses and digests travel as `0x` hex, and
//! timestamps as unsigned Unix seconds. Deserialization validates formats;
//! [`AuthorizationData::validate`] and friends check the cross-field rules.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::bytes::HexBytes;
use crate::digest::Digest;
use crate::error::TypeError;

/// A guardian's grant of pickup rights for one child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    #[serde(rename = "guardianAddr")]
    pub guardian: Address,
    #[serde(rename = "pickupAddr")]
    pub pickup: Address,
    /// Pseudonymized student identifier, never the raw ID.
    pub student_hash: Digest,
    pub start_time: u64,
    pub end_time: u64,
    /// 65-byte recoverable signature by the guardian.
    pub signature: HexBytes,
}

impl AuthorizationData {
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.start_time > self.end_time {
            return Err(TypeError::InvalidTimeRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if self.signature.is_empty() {
            return Err(TypeError::MissingField("signature"));
        }
        if self.student_hash.is_zero() {
            return Err(TypeError::MissingField("studentHash"));
        }
        Ok(())
    }

    /// Parse a JSON payload and validate it.
    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        let data: Self = serde_json::from_str(json).map_err(payload_error)?;
        data.validate()?;
        Ok(data)
    }
}

/// One physical pickup occurrence, recorded at scan confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupEventData {
    pub student_hash: Digest,
    #[serde(rename = "pickupAddr")]
    pub pickup: Address,
    #[serde(rename = "staffAddr")]
    pub staff: Address,
    pub scan_code_hash: Digest,
    pub timestamp: u64,
}

impl PickupEventData {
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.student_hash.is_zero() {
            return Err(TypeError::MissingField("studentHash"));
        }
        if self.scan_code_hash.is_zero() {
            return Err(TypeError::MissingField("scanCodeHash"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        let data: Self = serde_json::from_str(json).map_err(payload_error)?;
        data.validate()?;
        Ok(data)
    }
}

/// A committed group of pickup events, as anchored on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleBatchData {
    pub merkle_root: Digest,
    pub batch_number: u64,
    pub timestamp: u64,
    /// Zero until the ledger confirms the anchoring transaction.
    pub block_number: u64,
    pub event_count: u64,
    /// Where the full event set lives off-ledger (URI, object key, ...).
    pub external_data_pointer: String,
}

impl MerkleBatchData {
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.merkle_root.is_zero() {
            return Err(TypeError::MissingField("merkleRoot"));
        }
        if self.batch_number == 0 {
            return Err(TypeError::MissingField("batchNumber"));
        }
        if self.event_count == 0 {
            return Err(TypeError::MissingField("eventCount"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        let data: Self = serde_json::from_str(json).map_err(payload_error)?;
        data.validate()?;
        Ok(data)
    }
}

fn payload_error(e: serde_json::Error) -> TypeError {
    TypeError::Payload(e.to_string())
}
