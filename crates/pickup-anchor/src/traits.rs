use async_trait::async_trait;

use crate::contract::{ContractCall, ContractQuery, QueryResponse, TxReceipt};
use crate::error::LedgerResult;

/// Capability boundary to the ledger contract.
///
/// Implementations submit state-changing calls and answer read-only
/// queries. They perform no retries and impose no timeouts; the caller
/// decides what to do with a failure.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    async fn submit(&self, call: ContractCall) -> LedgerResult<TxReceipt>;
    async fn read(&self, query: ContractQuery) -> LedgerResult<QueryResponse>;
}
