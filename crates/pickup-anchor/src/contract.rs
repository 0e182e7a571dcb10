//! The ledger contract's call and query surface.
//!
//! The contract only ever sees hashes and addresses. Raw student IDs and
//! full event sets stay off-ledger.

use pickup_types::{Address, Digest, MerkleBatchData, PickupEventData};
use serde::{Deserialize, Serialize};

/// State-changing contract calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    CreateAuthorization {
        authorization_hash: Digest,
        guardian: Address,
    },
    RevokeAuthorization {
        authorization_hash: Digest,
    },
    RecordPickupEvent {
        event_hash: Digest,
        event: PickupEventData,
    },
    AnchorMerkleBatch {
        batch: MerkleBatchData,
    },
}

impl ContractCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateAuthorization { .. } => "createAuthorization",
            Self::RevokeAuthorization { .. } => "revokeAuthorization",
            Self::RecordPickupEvent { .. } => "recordPickupEvent",
            Self::AnchorMerkleBatch { .. } => "anchorMerkleBatch",
        }
    }
}

/// Read-only contract queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractQuery {
    IsAuthorizationRegistered {
        authorization_hash: Digest,
    },
    GetAuthorization {
        authorization_hash: Digest,
    },
    IsPickupRegistered {
        event_hash: Digest,
    },
    GetPickupEvent {
        event_hash: Digest,
    },
    GetMerkleBatch {
        batch_number: u64,
    },
    VerifyPickupEvent {
        event_hash: Digest,
        batch_number: u64,
        proof: Vec<Digest>,
    },
    GetContractStats,
}

impl ContractQuery {
    pub fn method(&self) -> &'static str {
        match self {
            Self::IsAuthorizationRegistered { .. } => "isAuthorizationRegistered",
            Self::GetAuthorization { .. } => "getAuthorization",
            Self::IsPickupRegistered { .. } => "isPickupRegistered",
            Self::GetPickupEvent { .. } => "getPickupEvent",
            Self::GetMerkleBatch { .. } => "getMerkleBatch",
            Self::VerifyPickupEvent { .. } => "verifyPickupEvent",
            Self::GetContractStats => "getContractStats",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryResponse {
    Registered(bool),
    Authorization(Option<AuthorizationRecord>),
    PickupEvent(Option<PickupRecord>),
    Batch(Option<MerkleBatchData>),
    Verified(bool),
    Stats(ContractStats),
}

/// An authorization as the contract stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
    pub authorization_hash: Digest,
    pub guardian: Address,
    pub block_number: u64,
    pub revoked: bool,
}

/// A pickup event as the contract stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupRecord {
    pub event_hash: Digest,
    pub event: PickupEventData,
    pub block_number: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStats {
    pub total_authorizations: u64,
    pub revoked_authorizations: u64,
    pub total_pickup_events: u64,
    pub total_batches: u64,
    pub latest_batch_number: u64,
}

/// Proof that a call was included in a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: Digest,
    pub block_number: u64,
}
