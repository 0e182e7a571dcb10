//! Merkle batching of pickup events.
//!
//! Pickup events are grouped into batches whose Merkle root is anchored on
//! the ledger in a single transaction. This crate assembles batches,
//! allocates their numbers, issues per-event inclusion proofs, and checks a
//! claimed batch against its events.
//!
//! # Example
//!
//! ```no_run
//! use pickup_batch::{BatchAllocator, BatchBuilder, BatchConfig};
//! # fn events() -> Vec<pickup_types::PickupEventData> { vec![] }
//!
//! let allocator = BatchAllocator::new();
//! let mut builder = BatchBuilder::new(BatchConfig::default());
//! for event in events() {
//!     builder.push(event)?;
//! }
//! let sealed = builder.seal(&allocator, 1_700_000_000, "s3://pickups/batch-1.json")?;
//! println!("root {}", sealed.root());
//! # Ok::<(), pickup_batch::BatchError>(())
//! ```

pub mod allocator;
pub mod batch;
pub mod config;
pub mod error;

pub use allocator::BatchAllocator;
pub use batch::{compute_root, validate_batch, BatchBuilder, BatchProof, SealedBatch};
pub use config::BatchConfig;
pub use error::{BatchError, BatchResult};
