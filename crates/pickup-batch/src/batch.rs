use std::collections::HashSet;

use pickup_crypto::{pickup_event_hash, MerkleProof, MerkleTree};
use pickup_types::{Digest, MerkleBatchData, PickupEventData};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocator::BatchAllocator;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};

/// Accumulates pickup events for the next batch.
#[derive(Debug)]
pub struct BatchBuilder {
    config: BatchConfig,
    events: Vec<PickupEventData>,
    leaves: Vec<Digest>,
    seen: HashSet<Digest>,
}

impl BatchBuilder {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            leaves: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add an event, returning its leaf hash.
    ///
    /// Rejects malformed events, events already in the batch, and events
    /// beyond the configured maximum.
    pub fn push(&mut self, event: PickupEventData) -> BatchResult<Digest> {
        event.validate()?;
        let leaf = pickup_event_hash(&event);
        if self.seen.contains(&leaf) {
            return Err(BatchError::DuplicateEvent(leaf));
        }
        if self.events.len() >= self.config.max_events {
            return Err(BatchError::AboveMaximum {
                count: self.events.len() + 1,
                max: self.config.max_events,
            });
        }
        self.seen.insert(leaf);
        self.leaves.push(leaf);
        self.events.push(event);
        debug!(leaf = %leaf.short_hex(), pending = self.events.len(), "event added to batch");
        Ok(leaf)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.config.max_events
    }

    /// Close the batch: check bounds, build the tree, allocate a number.
    ///
    /// The number is only allocated once the batch is known to be sealable,
    /// so a rejected batch never burns one.
    pub fn seal(
        self,
        allocator: &BatchAllocator,
        timestamp: u64,
        external_data_pointer: impl Into<String>,
    ) -> BatchResult<SealedBatch> {
        self.config.check_bounds(self.events.len())?;
        let tree = MerkleTree::from_leaves(self.leaves);
        let batch_number = allocator.allocate()?;

        let data = MerkleBatchData {
            merkle_root: tree.root(),
            batch_number,
            timestamp,
            block_number: 0,
            event_count: self.events.len() as u64,
            external_data_pointer: external_data_pointer.into(),
        };
        info!(
            batch_number,
            events = data.event_count,
            root = %data.merkle_root,
            "sealed batch"
        );
        Ok(SealedBatch {
            data,
            events: self.events,
            tree,
        })
    }
}

/// A closed batch, ready to anchor.
#[derive(Clone, Debug)]
pub struct SealedBatch {
    data: MerkleBatchData,
    events: Vec<PickupEventData>,
    tree: MerkleTree,
}

impl SealedBatch {
    pub fn data(&self) -> &MerkleBatchData {
        &self.data
    }

    pub fn events(&self) -> &[PickupEventData] {
        &self.events
    }

    pub fn root(&self) -> Digest {
        self.data.merkle_root
    }

    pub fn batch_number(&self) -> u64 {
        self.data.batch_number
    }

    /// Record the block the anchoring transaction landed in.
    pub fn set_block_number(&mut self, block_number: u64) {
        self.data.block_number = block_number;
    }

    pub fn proof_for(&self, leaf: &Digest) -> BatchResult<BatchProof> {
        let proof = self.tree.proof(leaf).ok_or(BatchError::UnknownLeaf(*leaf))?;
        Ok(BatchProof {
            batch_number: self.data.batch_number,
            leaf: proof.leaf,
            siblings: proof.siblings,
        })
    }

    pub fn proof_for_event(&self, event: &PickupEventData) -> BatchResult<BatchProof> {
        self.proof_for(&pickup_event_hash(event))
    }
}

/// Inclusion proof for one event, bound to the batch it was sealed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProof {
    pub batch_number: u64,
    pub leaf: Digest,
    pub siblings: Vec<Digest>,
}

impl BatchProof {
    pub fn verify(&self, root: &Digest) -> bool {
        self.as_merkle_proof().verify(root)
    }

    /// Verify that `event`, as presented now, is the leaf this proof covers.
    pub fn verify_event(&self, event: &PickupEventData, root: &Digest) -> bool {
        let leaf = pickup_event_hash(event);
        MerkleProof {
            leaf,
            siblings: self.siblings.clone(),
        }
        .verify(root)
    }

    pub fn as_merkle_proof(&self) -> MerkleProof {
        MerkleProof {
            leaf: self.leaf,
            siblings: self.siblings.clone(),
        }
    }
}

/// Merkle root over the leaf hashes of `events`.
pub fn compute_root(events: &[PickupEventData]) -> Digest {
    MerkleTree::from_leaves(events.iter().map(pickup_event_hash).collect()).root()
}

/// Check a claimed batch against the events it supposedly commits to.
///
/// Bounds are checked before anything is hashed.
pub fn validate_batch(
    events: &[PickupEventData],
    claimed_root: &Digest,
    claimed_count: u64,
    config: &BatchConfig,
) -> BatchResult<()> {
    let claimed = usize::try_from(claimed_count).unwrap_or(usize::MAX);
    config.check_bounds(claimed)?;

    let actual = events.len() as u64;
    if actual != claimed_count {
        return Err(BatchError::CountMismatch {
            claimed: claimed_count,
            actual,
        });
    }

    let computed = compute_root(events);
    if computed != *claimed_root {
        return Err(BatchError::RootMismatch {
            claimed: *claimed_root,
            computed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickup_crypto::student_hash;
    use pickup_types::Address;
    use proptest::prelude::*;

    fn event(n: u64) -> PickupEventData {
        PickupEventData {
            student_hash: student_hash(&format!("S-{n}")),
            pickup: Address::from_bytes([2; 20]),
            staff: Address::from_bytes([3; 20]),
            scan_code_hash: Digest::from_hash([4; 32]),
            timestamp: 1_700_000_000 + n,
        }
    }

    fn sealed(n: u64) -> SealedBatch {
        let mut builder = BatchBuilder::new(BatchConfig::default());
        for i in 0..n {
            builder.push(event(i)).unwrap();
        }
        builder
            .seal(&BatchAllocator::new(), 1_700_000_500, "mem://batch")
            .unwrap()
    }

    #[test]
    fn three_event_proof_verifies() {
        let batch = sealed(3);
        let e1 = &batch.events()[1];
        let proof = batch.proof_for_event(e1).unwrap();
        assert_eq!(proof.batch_number, 1);
        assert!(proof.verify(&batch.root()));
        assert!(proof.verify_event(e1, &batch.root()));
    }

    #[test]
    fn altered_event_fails_against_original_root() {
        let batch = sealed(3);
        let root = batch.root();
        let proof = batch.proof_for_event(&batch.events()[1]).unwrap();

        let mut tampered = batch.events()[1].clone();
        tampered.timestamp += 1;
        assert!(!proof.verify_event(&tampered, &root));
    }

    #[test]
    fn five_event_batch_round_trips() {
        let batch = sealed(5);
        assert_eq!(batch.data().event_count, 5);
        for e in batch.events() {
            assert!(batch.proof_for_event(e).unwrap().verify_event(e, &batch.root()));
        }
        assert!(validate_batch(batch.events(), &batch.root(), 5, &BatchConfig::default()).is_ok());
    }

    #[test]
    fn sealed_data_is_complete() {
        let batch = sealed(2);
        let data = batch.data();
        assert_eq!(data.merkle_root, compute_root(batch.events()));
        assert_eq!(data.timestamp, 1_700_000_500);
        assert_eq!(data.block_number, 0);
        assert_eq!(data.external_data_pointer, "mem://batch");
        assert!(data.validate().is_ok());
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut builder = BatchBuilder::new(BatchConfig::default());
        let leaf = builder.push(event(1)).unwrap();
        assert_eq!(builder.push(event(1)), Err(BatchError::DuplicateEvent(leaf)));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn malformed_event_is_rejected() {
        let mut builder = BatchBuilder::new(BatchConfig::default());
        let mut e = event(1);
        e.scan_code_hash = Digest::zero();
        assert!(matches!(builder.push(e), Err(BatchError::InvalidEvent(_))));
    }

    #[test]
    fn builder_stops_at_maximum() {
        let config = BatchConfig {
            min_events: 1,
            max_events: 2,
        };
        let mut builder = BatchBuilder::new(config);
        builder.push(event(1)).unwrap();
        builder.push(event(2)).unwrap();
        assert!(builder.is_full());
        assert_eq!(
            builder.push(event(3)),
            Err(BatchError::AboveMaximum { count: 3, max: 2 })
        );
    }

    #[test]
    fn empty_batch_does_not_burn_a_number() {
        let allocator = BatchAllocator::new();
        let builder = BatchBuilder::new(BatchConfig::default());
        assert!(builder.is_empty());
        let err = builder.seal(&allocator, 0, "").unwrap_err();
        assert_eq!(err, BatchError::BelowMinimum { count: 0, min: 1 });
        assert_eq!(allocator.peek().unwrap(), 1);
    }

    #[test]
    fn batch_numbers_increase_across_seals() {
        let allocator = BatchAllocator::new();
        let mut numbers = vec![];
        for i in 0..3 {
            let mut b = BatchBuilder::new(BatchConfig::default());
            b.push(event(i)).unwrap();
            numbers.push(b.seal(&allocator, 0, "").unwrap().batch_number());
        }
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_leaf_has_no_proof() {
        let batch = sealed(3);
        let outsider = pickup_event_hash(&event(99));
        assert_eq!(batch.proof_for(&outsider), Err(BatchError::UnknownLeaf(outsider)));
    }

    #[test]
    fn validation_checks_bounds_first() {
        let config = BatchConfig::default();
        let root = Digest::from_hash([1; 32]);
        assert_eq!(
            validate_batch(&[], &root, 0, &config),
            Err(BatchError::BelowMinimum { count: 0, min: 1 })
        );
        assert_eq!(
            validate_batch(&[event(1)], &root, 257, &config),
            Err(BatchError::AboveMaximum { count: 257, max: 256 })
        );
    }

    #[test]
    fn validation_detects_count_and_root_mismatch() {
        let batch = sealed(3);
        let config = BatchConfig::default();
        assert_eq!(
            validate_batch(batch.events(), &batch.root(), 4, &config),
            Err(BatchError::CountMismatch { claimed: 4, actual: 3 })
        );

        let mut events = batch.events().to_vec();
        events[0].timestamp += 1;
        let err = validate_batch(&events, &batch.root(), 3, &config).unwrap_err();
        assert!(matches!(err, BatchError::RootMismatch { .. }));
        assert_eq!(err.category(), pickup_types::ErrorCategory::Proof);
    }

    #[test]
    fn proof_serializes_with_wire_names() {
        let batch = sealed(2);
        let proof = batch.proof_for_event(&batch.events()[0]).unwrap();
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["batchNumber"], 1);
        let back: BatchProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }

    proptest! {
        #[test]
        fn any_sized_batch_validates(n in 1u64..64) {
            let batch = sealed(n);
            prop_assert!(validate_batch(batch.events(), &batch.root(), n, &BatchConfig::default()).is_ok());
            for e in batch.events() {
                prop_assert!(batch.proof_for_event(e).unwrap().verify(&batch.root()));
            }
        }
    }
}
