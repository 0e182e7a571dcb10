//! Ledger anchoring for the pickup integrity engine.
//!
//! The ledger contract is reached through the [`LedgerContract`] capability
//! trait. [`AnchorClient`] is the single component that submits calls and
//! reads ledger facts; [`InMemoryLedger`] is the reference adapter used by
//! tests, demos, and embedders without a chain.

pub mod client;
pub mod contract;
pub mod error;
pub mod memory;
pub mod traits;

pub use client::{AnchorClient, AnchorOutcome, TxOutcome};
pub use contract::{
    AuthorizationRecord, ContractCall, ContractQuery, ContractStats, PickupRecord, QueryResponse,
    TxReceipt,
};
pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use traits::LedgerContract;
