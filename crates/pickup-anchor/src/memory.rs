use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pickup_crypto::{keccak256, verify_proof};
use pickup_types::{Digest, MerkleBatchData};
use tracing::debug;

use crate::contract::{
    AuthorizationRecord, ContractCall, ContractQuery, ContractStats, PickupRecord, QueryResponse,
    TxReceipt,
};
use crate::error::{LedgerError, LedgerResult};
use crate::traits::LedgerContract;

/// In-memory ledger contract for tests, local demos, and embedding.
///
/// Enforces the same rules as the deployed contract: a hash registers at
/// most once, only registered and unrevoked authorizations can be revoked,
/// and batch numbers strictly increase. Every accepted call mints a new
/// block. Block numbers and transaction hashes are deterministic.
pub struct InMemoryLedger {
    deployed: bool,
    reachable: AtomicBool,
    inner: RwLock<ContractState>,
}

#[derive(Default)]
struct ContractState {
    authorizations: HashMap<Digest, AuthorizationRecord>,
    pickups: HashMap<Digest, PickupRecord>,
    batches: BTreeMap<u64, MerkleBatchData>,
    block_number: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            deployed: true,
            reachable: AtomicBool::new(true),
            inner: RwLock::new(ContractState::default()),
        }
    }

    /// A ledger with no contract at the configured address. Every call fails.
    pub fn undeployed() -> Self {
        Self {
            deployed: false,
            ..Self::new()
        }
    }

    /// Simulate losing (or regaining) the connection to the ledger node.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Latest minted block number; zero before the first transaction.
    pub fn block_number(&self) -> LedgerResult<u64> {
        Ok(self.read_state()?.block_number)
    }

    fn check_available(&self) -> LedgerResult<()> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unreachable("connection refused".into()));
        }
        if !self.deployed {
            return Err(LedgerError::NotDeployed);
        }
        Ok(())
    }

    fn read_state(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, ContractState>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::State("ledger read lock poisoned".into()))
    }

    fn execute(state: &mut ContractState, call: &ContractCall) -> LedgerResult<u64> {
        let block = state.block_number + 1;
        match call {
            ContractCall::CreateAuthorization {
                authorization_hash,
                guardian,
            } => {
                if authorization_hash.is_zero() {
                    return Err(LedgerError::Reverted("empty authorization hash".into()));
                }
                if state.authorizations.contains_key(authorization_hash) {
                    return Err(LedgerError::AlreadyRegistered(*authorization_hash));
                }
                state.authorizations.insert(
                    *authorization_hash,
                    AuthorizationRecord {
                        authorization_hash: *authorization_hash,
                        guardian: *guardian,
                        block_number: block,
                        revoked: false,
                    },
                );
            }
            ContractCall::RevokeAuthorization { authorization_hash } => {
                let record = state
                    .authorizations
                    .get_mut(authorization_hash)
                    .ok_or(LedgerError::UnknownAuthorization(*authorization_hash))?;
                if record.revoked {
                    return Err(LedgerError::AlreadyRevoked(*authorization_hash));
                }
                record.revoked = true;
            }
            ContractCall::RecordPickupEvent { event_hash, event } => {
                if event_hash.is_zero() {
                    return Err(LedgerError::Reverted("empty event hash".into()));
                }
                if state.pickups.contains_key(event_hash) {
                    return Err(LedgerError::AlreadyRegistered(*event_hash));
                }
                state.pickups.insert(
                    *event_hash,
                    PickupRecord {
                        event_hash: *event_hash,
                        event: event.clone(),
                        block_number: block,
                    },
                );
            }
            ContractCall::AnchorMerkleBatch { batch } => {
                if batch.merkle_root.is_zero() {
                    return Err(LedgerError::Reverted("empty merkle root".into()));
                }
                if batch.event_count == 0 {
                    return Err(LedgerError::Reverted("batch has no events".into()));
                }
                let latest = state.batches.keys().next_back().copied().unwrap_or(0);
                if batch.batch_number <= latest {
                    return Err(LedgerError::StaleBatchNumber {
                        number: batch.batch_number,
                        latest,
                    });
                }
                let mut stored = batch.clone();
                stored.block_number = block;
                state.batches.insert(batch.batch_number, stored);
            }
        }
        state.block_number = block;
        Ok(block)
    }

    fn query(state: &ContractState, query: &ContractQuery) -> QueryResponse {
        match query {
            ContractQuery::IsAuthorizationRegistered { authorization_hash } => {
                QueryResponse::Registered(state.authorizations.contains_key(authorization_hash))
            }
            ContractQuery::GetAuthorization { authorization_hash } => {
                QueryResponse::Authorization(state.authorizations.get(authorization_hash).cloned())
            }
            ContractQuery::IsPickupRegistered { event_hash } => {
                QueryResponse::Registered(state.pickups.contains_key(event_hash))
            }
            ContractQuery::GetPickupEvent { event_hash } => {
                QueryResponse::PickupEvent(state.pickups.get(event_hash).cloned())
            }
            ContractQuery::GetMerkleBatch { batch_number } => {
                QueryResponse::Batch(state.batches.get(batch_number).cloned())
            }
            ContractQuery::VerifyPickupEvent {
                event_hash,
                batch_number,
                proof,
            } => QueryResponse::Verified(
                state
                    .batches
                    .get(batch_number)
                    .is_some_and(|b| verify_proof(event_hash, proof, &b.merkle_root)),
            ),
            ContractQuery::GetContractStats => QueryResponse::Stats(ContractStats {
                total_authorizations: state.authorizations.len() as u64,
                revoked_authorizations: state
                    .authorizations
                    .values()
                    .filter(|a| a.revoked)
                    .count() as u64,
                total_pickup_events: state.pickups.len() as u64,
                total_batches: state.batches.len() as u64,
                latest_batch_number: state.batches.keys().next_back().copied().unwrap_or(0),
            }),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerContract for InMemoryLedger {
    async fn submit(&self, call: ContractCall) -> LedgerResult<TxReceipt> {
        self.check_available()?;
        let mut state = self
            .inner
            .write()
            .map_err(|_| LedgerError::State("ledger write lock poisoned".into()))?;
        let block_number = Self::execute(&mut state, &call)?;
        let tx_hash = transaction_hash(&call, block_number);
        debug!(method = call.method(), block_number, tx = %tx_hash.short_hex(), "transaction mined");
        Ok(TxReceipt {
            tx_hash,
            block_number,
        })
    }

    async fn read(&self, query: ContractQuery) -> LedgerResult<QueryResponse> {
        self.check_available()?;
        let state = self.read_state()?;
        Ok(Self::query(&state, &query))
    }
}

/// Deterministic transaction hash: each block holds exactly one transaction.
fn transaction_hash(call: &ContractCall, block_number: u64) -> Digest {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(call.method().as_bytes());
    buf.extend_from_slice(&block_number.to_be_bytes());
    keccak256(&buf)
}
