//! Foundation types for the pickup integrity engine.
//!
//! Every other `pickup-*` crate depends on this one. It holds the canonical
//! address and digest types, the records exchanged with the application
//! layer, and the shared error taxonomy.
//!
//! # Key Types
//!
//! - [`Address`]: 20-byte account address with canonical lowercase form
//! - [`Digest`]: 32-byte commitment, ordered by numeric value
//! - [`AuthorizationData`], [`PickupEventData`], [`MerkleBatchData`]: wire records
//! - [`ErrorCategory`]: validation / authentication / ledger / proof / lifecycle

pub mod address;
pub mod bytes;
pub mod digest;
pub mod error;
pub mod records;
pub mod time;

pub use address::{is_valid_address, normalize_address, Address};
pub use bytes::{normalize_hex, HexBytes};
pub use digest::Digest;
pub use error::{ErrorCategory, TypeError};
pub use records::{AuthorizationData, MerkleBatchData, PickupEventData};
pub use time::{unix_now, within_window};
