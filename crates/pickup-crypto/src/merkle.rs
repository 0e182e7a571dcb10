use pickup_types::Digest;
use serde::{Deserialize, Serialize};

use crate::hasher::keccak256;

/// Binary Merkle tree with sorted pairing.
///
/// Every level is sorted by byte value before pairing, consecutive entries
/// are paired, and an odd last entry is paired with itself. Because each
/// pair is hashed smaller-first, both proof generation and verification work
/// purely from hash values; no positional index survives a level.
///
/// A consequence is that the root depends only on the multiset of leaves,
/// not on the order they were supplied in.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: Digest,
    /// Leaves in the order they were supplied.
    leaves: Vec<Digest>,
    /// Sorted levels. Level 0 = sorted leaves, last = `[root]`.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    ///
    /// An empty list produces a zero root. A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: Digest::zero(),
                leaves: vec![],
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<Digest>> = Vec::new();
        let mut current = leaves.clone();

        loop {
            current.sort_unstable();
            if current.len() == 1 {
                levels.push(current);
                break;
            }
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(current);
            current = next;
        }

        let root = levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_default();
        Self {
            root,
            leaves,
            levels,
        }
    }

    pub fn root(&self) -> Digest {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaves(&self) -> &[Digest] {
        &self.leaves
    }

    /// Number of hashing levels above the leaves.
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    pub fn contains(&self, leaf: &Digest) -> bool {
        self.levels
            .first()
            .is_some_and(|level| level.binary_search(leaf).is_ok())
    }

    /// Generate an inclusion proof for `leaf`, or `None` if it is not a member.
    ///
    /// At each level the running node is located by value in the sorted
    /// level, its pairing partner is recorded, and the parent becomes the
    /// running node for the next level.
    pub fn proof(&self, leaf: &Digest) -> Option<MerkleProof> {
        if !self.contains(leaf) {
            return None;
        }
        let (_, inner) = self.levels.split_last()?;
        let mut current = *leaf;
        let mut siblings = Vec::with_capacity(inner.len());

        for level in inner {
            let idx = level.binary_search(&current).ok()?;
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = level.get(sibling_idx).copied().unwrap_or(current);
            siblings.push(sibling);
            current = hash_sorted_pair(&current, &sibling);
        }

        Some(MerkleProof {
            leaf: *leaf,
            siblings,
        })
    }

    /// Proof for the leaf at `index` in supply order.
    pub fn proof_at(&self, index: usize) -> Option<MerkleProof> {
        self.leaves.get(index).and_then(|leaf| self.proof(leaf))
    }
}

/// Merkle inclusion proof: the leaf and its sibling path up to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Digest,
    pub siblings: Vec<Digest>,
}

impl MerkleProof {
    /// Fold the sibling path into a root candidate.
    pub fn compute_root(&self) -> Digest {
        self.siblings
            .iter()
            .fold(self.leaf, |current, sibling| hash_sorted_pair(&current, sibling))
    }

    /// Verify the proof against a trusted root.
    pub fn verify(&self, root: &Digest) -> bool {
        self.compute_root() == *root
    }
}

/// Verify that `leaf` is included under `root` via `siblings`.
pub fn verify_proof(leaf: &Digest, siblings: &[Digest], root: &Digest) -> bool {
    siblings
        .iter()
        .fold(*leaf, |current, sibling| hash_sorted_pair(&current, sibling))
        == *root
}

/// Parent of two nodes, smaller value first.
pub fn hash_sorted_pair(a: &Digest, b: &Digest) -> Digest {
    if a <= b {
        hash_pair(a, b)
    } else {
        hash_pair(b, a)
    }
}

fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_bytes());
    buf[32..].copy_from_slice(right.as_bytes());
    keccak256(&buf)
}
