//! # Fixed-Depth Membership Tree
//!
//! A binary Poseidon Merkle tree of depth [`TREE_DEPTH`] over a feed's
//! active commitments. Unused leaves hold field zero and every empty
//! subtree hashes to a precomputed zero value:
//! `zero[0] = 0`, `zero[i+1] = H(zero[i], zero[i])`.
//!
//! ## Leaf Order
//!
//! [`MembershipTree::from_commitments`] sorts and deduplicates the leaf
//! set by byte value, so the root is a pure function of the set of active
//! commitments and not of registration order. Trees are rebuilt from the
//! store on demand; nothing here is persisted.
//!
//! ## Paths
//!
//! `indices[i] == 0` means the node at level `i` is a left child (its
//! sibling is on the right); `1` means it is a right child.

use std::sync::OnceLock;

use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use rxn_core::{Commitment, FieldBytes, MerkleRoot, TREE_DEPTH};

use crate::error::CryptoError;
use crate::field::{FieldEncoding, Fq};
use crate::poseidon::hash_node;

/// Maximum number of leaves.
pub const TREE_CAPACITY: usize = 1 << TREE_DEPTH;

static ZERO_HASHES: OnceLock<[Fq; TREE_DEPTH + 1]> = OnceLock::new();

/// Roots of empty subtrees by height; `zero_hashes()[TREE_DEPTH]` is the
/// root of the empty tree.
pub fn zero_hashes() -> &'static [Fq; TREE_DEPTH + 1] {
    ZERO_HASHES.get_or_init(|| {
        let mut zeros = [Fq::zero(); TREE_DEPTH + 1];
        for i in 0..TREE_DEPTH {
            zeros[i + 1] = hash_node(zeros[i], zeros[i]);
        }
        zeros
    })
}

/// Root of a tree with no leaves.
pub fn empty_root() -> MerkleRoot {
    MerkleRoot::from_field(&zero_hashes()[TREE_DEPTH])
}

/// Authentication path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPath {
    /// Sibling at each level, leaf level first.
    pub elements: Vec<FieldBytes>,
    /// 0 when the node is the left child at that level, 1 when right.
    pub indices: Vec<u8>,
}

/// A fully materialized membership tree.
#[derive(Debug, Clone)]
pub struct MembershipTree {
    /// `levels[0]` holds the occupied leaves, `levels[TREE_DEPTH]` the root
    /// (or nothing, for the empty tree). Missing right siblings are the
    /// level's zero hash.
    levels: Vec<Vec<Fq>>,
}

impl MembershipTree {
    /// Build from a set of commitments in canonical (sorted) leaf order.
    pub fn from_commitments<'a, I>(commitments: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = &'a Commitment>,
    {
        let mut sorted: Vec<Commitment> = commitments.into_iter().copied().collect();
        sorted.sort_unstable();
        sorted.dedup();
        let leaves = sorted
            .iter()
            .map(FieldEncoding::to_field)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_leaves(leaves)
    }

    /// Build from leaves in the given order.
    pub fn from_leaves(leaves: Vec<Fq>) -> Result<Self, CryptoError> {
        if leaves.len() > TREE_CAPACITY {
            return Err(CryptoError::TreeFull {
                count: leaves.len(),
                capacity: TREE_CAPACITY,
            });
        }
        let zeros = zero_hashes();
        let mut levels = Vec::with_capacity(TREE_DEPTH + 1);
        levels.push(leaves);
        for depth in 0..TREE_DEPTH {
            let next: Vec<Fq> = levels[depth]
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zeros[depth]);
                    hash_node(pair[0], right)
                })
                .collect();
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Number of occupied leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// The root as a field element.
    pub fn root_field(&self) -> Fq {
        self.levels[TREE_DEPTH]
            .first()
            .copied()
            .unwrap_or(zero_hashes()[TREE_DEPTH])
    }

    /// The root, encoded.
    pub fn root(&self) -> MerkleRoot {
        MerkleRoot::from_field(&self.root_field())
    }

    /// Position of a commitment among the leaves.
    pub fn position(&self, commitment: &Commitment) -> Option<usize> {
        let leaf = commitment.to_field().ok()?;
        self.levels[0].iter().position(|l| *l == leaf)
    }

    /// Authentication path for the leaf at `index`.
    pub fn path(&self, index: usize) -> Result<MembershipPath, CryptoError> {
        if index >= self.len() {
            return Err(CryptoError::LeafOutOfRange {
                index,
                len: self.len(),
            });
        }
        let zeros = zero_hashes();
        let mut elements = Vec::with_capacity(TREE_DEPTH);
        let mut indices = Vec::with_capacity(TREE_DEPTH);
        let mut i = index;
        for depth in 0..TREE_DEPTH {
            let sibling = self.levels[depth]
                .get(i ^ 1)
                .copied()
                .unwrap_or(zeros[depth]);
            elements.push(FieldBytes::from_field(&sibling));
            indices.push((i & 1) as u8);
            i >>= 1;
        }
        Ok(MembershipPath { elements, indices })
    }

    /// Path for a commitment, if it is a leaf.
    pub fn proof_for(&self, commitment: &Commitment) -> Option<MembershipPath> {
        self.position(commitment).and_then(|i| self.path(i).ok())
    }
}

/// Recompute the root implied by a leaf and its path.
pub fn compute_root(leaf: &Commitment, path: &MembershipPath) -> Result<MerkleRoot, CryptoError> {
    if path.elements.len() != TREE_DEPTH || path.indices.len() != TREE_DEPTH {
        return Err(CryptoError::LeafOutOfRange {
            index: path.elements.len(),
            len: TREE_DEPTH,
        });
    }
    let mut current = leaf.to_field()?;
    for (sibling, index) in path.elements.iter().zip(&path.indices) {
        let sibling = sibling.to_field()?;
        current = match index {
            0 => hash_node(current, sibling),
            1 => hash_node(sibling, current),
            other => {
                return Err(CryptoError::NonCanonicalField(format!(
                    "path index must be 0 or 1, got {other}"
                )))
            }
        };
    }
    Ok(MerkleRoot::from_field(&current))
}

/// Whether `path` proves `leaf` under `root`. Malformed paths are `false`.
pub fn verify_membership_proof(leaf: &Commitment, path: &MembershipPath, root: &MerkleRoot) -> bool {
    matches!(compute_root(leaf, path), Ok(r) if r == *root)
}
