use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pickup_types::{Address, Digest, MerkleBatchData, PickupEventData};
use tracing::{debug, info, warn};

use crate::contract::{
    AuthorizationRecord, ContractCall, ContractQuery, ContractStats, PickupRecord, QueryResponse,
    TxReceipt,
};
use crate::error::{LedgerError, LedgerResult};
use crate::traits::LedgerContract;

/// Result of a state-changing call. Ledger failures are reported here, never
/// raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed(TxReceipt),
    Failed(LedgerError),
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            Self::Confirmed(receipt) => Some(receipt),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LedgerError> {
        match self {
            Self::Confirmed(_) => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl From<Result<TxReceipt, LedgerError>> for TxOutcome {
    fn from(result: Result<TxReceipt, LedgerError>) -> Self {
        match result {
            Ok(receipt) => Self::Confirmed(receipt),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Result of anchoring a batch, echoing what was anchored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorOutcome {
    pub batch_number: u64,
    pub merkle_root: Digest,
    pub outcome: TxOutcome,
}

/// The only component that talks to the ledger contract.
///
/// Writes return a [`TxOutcome`]. Each read comes in two forms: `try_*`
/// reports ledger failures to the caller, while the plain form logs them
/// and reads as "absent".
#[derive(Clone)]
pub struct AnchorClient {
    ledger: Arc<dyn LedgerContract>,
    batch_txs: Arc<RwLock<HashMap<u64, Digest>>>,
}

impl AnchorClient {
    pub fn new(ledger: Arc<dyn LedgerContract>) -> Self {
        Self {
            ledger,
            batch_txs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn submit(&self, call: ContractCall) -> TxOutcome {
        let method = call.method();
        let outcome = TxOutcome::from(self.ledger.submit(call).await);
        match &outcome {
            TxOutcome::Confirmed(receipt) => info!(
                method,
                block = receipt.block_number,
                tx = %receipt.tx_hash,
                "ledger transaction confirmed"
            ),
            TxOutcome::Failed(err) => warn!(
                method,
                error = %err,
                retryable = err.is_retryable(),
                "ledger transaction failed"
            ),
        }
        outcome
    }

    pub async fn create_authorization(
        &self,
        authorization_hash: Digest,
        guardian: Address,
    ) -> TxOutcome {
        self.submit(ContractCall::CreateAuthorization {
            authorization_hash,
            guardian,
        })
        .await
    }

    pub async fn revoke_authorization(&self, authorization_hash: Digest) -> TxOutcome {
        self.submit(ContractCall::RevokeAuthorization { authorization_hash })
            .await
    }

    pub async fn record_pickup_event(
        &self,
        event_hash: Digest,
        event: &PickupEventData,
    ) -> TxOutcome {
        self.submit(ContractCall::RecordPickupEvent {
            event_hash,
            event: event.clone(),
        })
        .await
    }

    pub async fn anchor_batch(&self, batch: &MerkleBatchData) -> AnchorOutcome {
        let outcome = self
            .submit(ContractCall::AnchorMerkleBatch {
                batch: batch.clone(),
            })
            .await;
        if let TxOutcome::Confirmed(receipt) = &outcome {
            match self.batch_txs.write() {
                Ok(mut txs) => {
                    txs.insert(batch.batch_number, receipt.tx_hash);
                }
                Err(_) => warn!(
                    batch_number = batch.batch_number,
                    "batch transaction map poisoned; tx hash not recorded"
                ),
            }
        }
        AnchorOutcome {
            batch_number: batch.batch_number,
            merkle_root: batch.merkle_root,
            outcome,
        }
    }

    /// Transaction hash that anchored `batch_number`, if this client anchored it.
    pub fn batch_transaction(&self, batch_number: u64) -> Option<Digest> {
        self.batch_txs
            .read()
            .ok()
            .and_then(|txs| txs.get(&batch_number).copied())
    }

    fn unexpected<T>(method: &'static str, response: &QueryResponse) -> LedgerResult<T> {
        debug!(method, ?response, "unexpected ledger response");
        Err(LedgerError::UnexpectedResponse(method))
    }

    /// Collapse a failed read into its "absent" value.
    fn or_absent<T: Default>(method: &'static str, result: LedgerResult<T>) -> T {
        result.unwrap_or_else(|err| {
            warn!(
                method,
                error = %err,
                retryable = err.is_retryable(),
                "ledger read failed"
            );
            T::default()
        })
    }

    pub async fn try_is_authorization_registered(
        &self,
        authorization_hash: Digest,
    ) -> LedgerResult<bool> {
        let query = ContractQuery::IsAuthorizationRegistered { authorization_hash };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Registered(registered) => Ok(registered),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn try_get_authorization(
        &self,
        authorization_hash: Digest,
    ) -> LedgerResult<Option<AuthorizationRecord>> {
        let query = ContractQuery::GetAuthorization { authorization_hash };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Authorization(record) => Ok(record),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn try_is_pickup_registered(&self, event_hash: Digest) -> LedgerResult<bool> {
        let query = ContractQuery::IsPickupRegistered { event_hash };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Registered(registered) => Ok(registered),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn try_get_pickup_event(
        &self,
        event_hash: Digest,
    ) -> LedgerResult<Option<PickupRecord>> {
        let query = ContractQuery::GetPickupEvent { event_hash };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::PickupEvent(record) => Ok(record),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn try_get_batch(&self, batch_number: u64) -> LedgerResult<Option<MerkleBatchData>> {
        let query = ContractQuery::GetMerkleBatch { batch_number };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Batch(batch) => Ok(batch),
            other => Self::unexpected(method, &other),
        }
    }

    /// Ask the contract to check an inclusion proof against its stored root.
    pub async fn try_verify_pickup_event(
        &self,
        event_hash: Digest,
        batch_number: u64,
        proof: &[Digest],
    ) -> LedgerResult<bool> {
        let query = ContractQuery::VerifyPickupEvent {
            event_hash,
            batch_number,
            proof: proof.to_vec(),
        };
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Verified(ok) => Ok(ok),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn try_get_contract_stats(&self) -> LedgerResult<ContractStats> {
        let query = ContractQuery::GetContractStats;
        let method = query.method();
        match self.ledger.read(query).await? {
            QueryResponse::Stats(stats) => Ok(stats),
            other => Self::unexpected(method, &other),
        }
    }

    pub async fn is_authorization_registered(&self, authorization_hash: Digest) -> bool {
        Self::or_absent(
            "isAuthorizationRegistered",
            self.try_is_authorization_registered(authorization_hash).await,
        )
    }

    pub async fn get_authorization(&self, authorization_hash: Digest) -> Option<AuthorizationRecord> {
        Self::or_absent(
            "getAuthorization",
            self.try_get_authorization(authorization_hash).await,
        )
    }

    pub async fn is_pickup_registered(&self, event_hash: Digest) -> bool {
        Self::or_absent(
            "isPickupRegistered",
            self.try_is_pickup_registered(event_hash).await,
        )
    }

    pub async fn get_pickup_event(&self, event_hash: Digest) -> Option<PickupRecord> {
        Self::or_absent("getPickupEvent", self.try_get_pickup_event(event_hash).await)
    }

    pub async fn get_batch(&self, batch_number: u64) -> Option<MerkleBatchData> {
        Self::or_absent("getMerkleBatch", self.try_get_batch(batch_number).await)
    }

    pub async fn verify_pickup_event(
        &self,
        event_hash: Digest,
        batch_number: u64,
        proof: &[Digest],
    ) -> bool {
        Self::or_absent(
            "verifyPickupEvent",
            self.try_verify_pickup_event(event_hash, batch_number, proof)
                .await,
        )
    }

    pub async fn get_contract_stats(&self) -> ContractStats {
        Self::or_absent("getContractStats", self.try_get_contract_stats().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLedger;
    use pickup_crypto::{pickup_event_hash, MerkleTree};

    fn event(n: u64) -> PickupEventData {
        PickupEventData {
            student_hash: Digest::from_hash([1; 32]),
            pickup: Address::from_bytes([2; 20]),
            staff: Address::from_bytes([3; 20]),
            scan_code_hash: Digest::from_hash([4; 32]),
            timestamp: 1_700_000_000 + n,
        }
    }

    fn client() -> (Arc<InMemoryLedger>, AnchorClient) {
        let ledger = Arc::new(InMemoryLedger::new());
        let client = AnchorClient::new(ledger.clone());
        (ledger, client)
    }

    #[tokio::test]
    async fn authorization_lifecycle() {
        let (_, client) = client();
        let hash = Digest::from_hash([5; 32]);
        let guardian = Address::from_bytes([1; 20]);

        assert!(!client.is_authorization_registered(hash).await);
        assert!(client.create_authorization(hash, guardian).await.is_confirmed());
        assert!(client.is_authorization_registered(hash).await);

        let record = client.get_authorization(hash).await.unwrap();
        assert_eq!(record.guardian, guardian);
        assert!(!record.revoked);

        assert!(client.revoke_authorization(hash).await.is_confirmed());
        assert!(client.get_authorization(hash).await.unwrap().revoked);
    }

    #[tokio::test]
    async fn resubmission_is_reported_not_raised() {
        let (_, client) = client();
        let hash = Digest::from_hash([5; 32]);
        let guardian = Address::from_bytes([1; 20]);
        client.create_authorization(hash, guardian).await;
        let outcome = client.create_authorization(hash, guardian).await;
        assert_eq!(outcome.error(), Some(&LedgerError::AlreadyRegistered(hash)));
        assert!(outcome.receipt().is_none());
    }

    #[tokio::test]
    async fn anchored_batch_is_readable_and_verifiable() {
        let (_, client) = client();
        let events: Vec<_> = (0..3).map(event).collect();
        let leaves: Vec<_> = events.iter().map(pickup_event_hash).collect();
        let tree = MerkleTree::from_leaves(leaves.clone());
        let batch = MerkleBatchData {
            merkle_root: tree.root(),
            batch_number: 1,
            timestamp: 1_700_000_100,
            block_number: 0,
            event_count: 3,
            external_data_pointer: "mem://1".into(),
        };

        let anchored = client.anchor_batch(&batch).await;
        assert_eq!(anchored.batch_number, 1);
        assert_eq!(anchored.merkle_root, tree.root());
        let receipt = *anchored.outcome.receipt().unwrap();
        assert_eq!(client.batch_transaction(1), Some(receipt.tx_hash));
        assert_eq!(client.batch_transaction(2), None);

        let stored = client.get_batch(1).await.unwrap();
        assert_eq!(stored.merkle_root, tree.root());
        assert_eq!(stored.block_number, receipt.block_number);

        let proof = tree.proof(&leaves[1]).unwrap();
        assert!(client.verify_pickup_event(leaves[1], 1, &proof.siblings).await);
        assert!(!client.verify_pickup_event(leaves[1], 2, &proof.siblings).await);
    }

    #[tokio::test]
    async fn pickup_event_records() {
        let (_, client) = client();
        let e = event(1);
        let hash = pickup_event_hash(&e);
        assert!(client.get_pickup_event(hash).await.is_none());
        assert!(client.record_pickup_event(hash, &e).await.is_confirmed());
        assert!(client.is_pickup_registered(hash).await);
        assert_eq!(client.get_pickup_event(hash).await.unwrap().event, e);
        assert_eq!(client.get_contract_stats().await.total_pickup_events, 1);
    }

    #[tokio::test]
    async fn reads_degrade_when_unreachable() {
        let (ledger, client) = client();
        let hash = Digest::from_hash([5; 32]);
        client
            .create_authorization(hash, Address::from_bytes([1; 20]))
            .await;

        ledger.set_reachable(false);
        assert!(!client.is_authorization_registered(hash).await);
        assert!(client.get_authorization(hash).await.is_none());
        assert_eq!(client.get_contract_stats().await, ContractStats::default());

        let outcome = client.revoke_authorization(hash).await;
        assert!(outcome.error().unwrap().is_retryable());
    }

    #[tokio::test]
    async fn fallible_reads_surface_the_outage() {
        let (ledger, client) = client();
        let hash = Digest::from_hash([5; 32]);
        client
            .create_authorization(hash, Address::from_bytes([1; 20]))
            .await;
        assert_eq!(client.try_is_authorization_registered(hash).await, Ok(true));
        assert_eq!(client.try_get_batch(1).await, Ok(None));

        ledger.set_reachable(false);
        let err = client.try_get_authorization(hash).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(client.try_get_batch(1).await.unwrap_err().is_retryable());
        assert!(client.try_get_pickup_event(hash).await.is_err());
        assert!(client.try_get_contract_stats().await.is_err());
    }

    #[tokio::test]
    async fn undeployed_contract_fails_writes() {
        let client = AnchorClient::new(Arc::new(InMemoryLedger::undeployed()));
        let outcome = client
            .create_authorization(Digest::from_hash([1; 32]), Address::from_bytes([1; 20]))
            .await;
        assert_eq!(outcome, TxOutcome::Failed(LedgerError::NotDeployed));
    }
}
