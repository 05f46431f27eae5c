//! # Data Model
//!
//! Persisted records of the reaction subsystem. These are plain data: the
//! invariants that govern how they change (append-only root history, one
//! nullifier row per member and message, monotone tally versions) are
//! enforced by the services and stores that own them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bytes::{Commitment, FieldBytes, MerkleRoot, Nullifier};
use crate::error::CoreError;
use crate::identity::{BlockHeight, FeedId, MessageId, TransactionId};

/// Fixed depth of every feed's membership tree (capacity 2^20 leaves).
pub const TREE_DEPTH: usize = 20;

// ─── Curve encodings ─────────────────────────────────────────────────

/// An affine curve point as two big-endian coordinates.
///
/// Not validated here. `rxn-crypto` decodes it and checks the curve
/// equation and subgroup before any arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurvePoint {
    /// X coordinate.
    pub x: FieldBytes,
    /// Y coordinate.
    pub y: FieldBytes,
}

impl CurvePoint {
    /// The twisted Edwards neutral element `(0, 1)`.
    pub fn identity() -> Self {
        let mut y = [0u8; 32];
        y[31] = 1;
        Self {
            x: FieldBytes::from_bytes([0u8; 32]),
            y: FieldBytes::from_bytes(y),
        }
    }
}

/// An ElGamal ciphertext `(C1, C2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElGamalCiphertext {
    /// Ephemeral component `rG`.
    pub c1: CurvePoint,
    /// Payload component `mG + rPK`.
    pub c2: CurvePoint,
}

impl ElGamalCiphertext {
    /// Encryption of zero with zero randomness; the neutral tally entry.
    pub fn identity() -> Self {
        Self {
            c1: CurvePoint::identity(),
            c2: CurvePoint::identity(),
        }
    }
}

/// One ciphertext per reaction slot.
///
/// A vote is a one-hot vector: the chosen slot encrypts 1, every other
/// slot encrypts 0. Tallies use the same shape and hold per-slot sums.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteCiphertext(pub Vec<ElGamalCiphertext>);

impl VoteCiphertext {
    /// An all-identity vector with `slots` entries.
    pub fn identity(slots: usize) -> Self {
        Self(vec![ElGamalCiphertext::identity(); slots])
    }

    /// Assemble from the four column arrays used on the wire.
    pub fn from_components(
        c1x: &[FieldBytes],
        c1y: &[FieldBytes],
        c2x: &[FieldBytes],
        c2y: &[FieldBytes],
    ) -> Result<Self, CoreError> {
        let n = c1x.len();
        if c1y.len() != n || c2x.len() != n || c2y.len() != n {
            return Err(CoreError::CiphertextShape(format!(
                "c1x={} c1y={} c2x={} c2y={}",
                c1x.len(),
                c1y.len(),
                c2x.len(),
                c2y.len()
            )));
        }
        let slots = (0..n)
            .map(|i| ElGamalCiphertext {
                c1: CurvePoint {
                    x: c1x[i],
                    y: c1y[i],
                },
                c2: CurvePoint {
                    x: c2x[i],
                    y: c2y[i],
                },
            })
            .collect();
        Ok(Self(slots))
    }

    /// Split back into `(c1x, c1y, c2x, c2y)` column arrays.
    pub fn components(&self) -> [Vec<FieldBytes>; 4] {
        let mut cols: [Vec<FieldBytes>; 4] = Default::default();
        for ct in &self.0 {
            cols[0].push(ct.c1.x);
            cols[1].push(ct.c1.y);
            cols[2].push(ct.c2.x);
            cols[3].push(ct.c2.y);
        }
        cols
    }

    /// Number of reaction slots.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the per-slot ciphertexts.
    pub fn iter(&self) -> std::slice::Iter<'_, ElGamalCiphertext> {
        self.0.iter()
    }
}

// ─── Membership ──────────────────────────────────────────────────────

/// A member's commitment registered in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMemberCommitment {
    /// Owning feed.
    pub feed_id: FeedId,
    /// The commitment leaf.
    pub commitment: Commitment,
    /// Wall-clock registration time.
    pub registered_at: DateTime<Utc>,
}

/// A commitment with rotation and revocation metadata.
///
/// Active iff `revoked_at_block` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberCommitment {
    /// Owning feed.
    pub feed_id: FeedId,
    /// The commitment leaf.
    pub commitment: Commitment,
    /// Feed key generation the member joined under.
    pub key_generation: u32,
    /// Wall-clock registration time.
    pub registered_at: DateTime<Utc>,
    /// Chain height at (re-)registration.
    pub registered_at_block: BlockHeight,
    /// Chain height at revocation, if revoked.
    pub revoked_at_block: Option<BlockHeight>,
}

impl GroupMemberCommitment {
    /// Whether the commitment participates in the current tree.
    pub fn is_active(&self) -> bool {
        self.revoked_at_block.is_none()
    }
}

impl From<GroupMemberCommitment> for FeedMemberCommitment {
    fn from(value: GroupMemberCommitment) -> Self {
        Self {
            feed_id: value.feed_id,
            commitment: value.commitment,
            registered_at: value.registered_at,
        }
    }
}

/// One append-only entry of a feed's root history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleRootHistory {
    /// Owning feed.
    pub feed_id: FeedId,
    /// Tree root over the active set at the time of appending.
    pub root: MerkleRoot,
    /// Chain height the root was recorded at.
    pub block_height: BlockHeight,
    /// Wall-clock append time.
    pub created_at: DateTime<Utc>,
}

// ─── Reactions ───────────────────────────────────────────────────────

/// The stored vote of one (member, message) pair, keyed by nullifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionNullifier {
    /// Replay tag; primary key.
    pub nullifier: Nullifier,
    /// Message reacted to.
    pub message_id: MessageId,
    /// The member's current vote.
    pub vote: VoteCiphertext,
    /// Opaque client backup of the plaintext reaction, encrypted client-side.
    pub encrypted_backup: Option<Vec<u8>>,
    /// First reaction time.
    pub created_at: DateTime<Utc>,
    /// Last replacement time.
    pub updated_at: DateTime<Utc>,
}

/// Running homomorphic tally of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionTally {
    /// Message tallied; primary key.
    pub message_id: MessageId,
    /// Feed the message belongs to.
    pub feed_id: FeedId,
    /// Per-slot ciphertext sums.
    pub tally: VoteCiphertext,
    /// Number of distinct nullifiers folded in.
    pub total_count: u64,
    /// Optimistic concurrency version, bumped on every write.
    pub version: u64,
    /// Last write time.
    pub last_updated: DateTime<Utc>,
}

/// Immutable audit row for an accepted reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTransaction {
    /// Row identifier returned to the submitter.
    pub id: TransactionId,
    /// Chain height at acceptance.
    pub block_height: BlockHeight,
    /// Feed of the message.
    pub feed_id: FeedId,
    /// Message reacted to.
    pub message_id: MessageId,
    /// Replay tag of the reaction.
    pub nullifier: Nullifier,
    /// Submitted vote ciphertext.
    pub ciphertext: VoteCiphertext,
    /// Raw proof bytes as submitted.
    pub proof_bytes: Vec<u8>,
    /// Circuit the proof was verified against.
    pub circuit_version: String,
    /// Acceptance time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fb(v: u8) -> FieldBytes {
        FieldBytes::from_bytes([v; 32])
    }

    #[test]
    fn identity_point_is_zero_one() {
        let id = CurvePoint::identity();
        assert_eq!(id.x.as_bytes(), &[0u8; 32]);
        assert_eq!(id.y.as_bytes()[31], 1);
        assert!(id.y.as_bytes()[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn components_roundtrip_column_order() {
        let c1x = vec![fb(1), fb(5)];
        let c1y = vec![fb(2), fb(6)];
        let c2x = vec![fb(3), fb(7)];
        let c2y = vec![fb(4), fb(8)];
        let vote = VoteCiphertext::from_components(&c1x, &c1y, &c2x, &c2y).unwrap();
        assert_eq!(vote.len(), 2);
        assert_eq!(vote.0[1].c2.x, fb(7));
        let [a, b, c, d] = vote.components();
        assert_eq!((a, b, c, d), (c1x, c1y, c2x, c2y));
    }

    #[test]
    fn mismatched_components_rejected() {
        let err = VoteCiphertext::from_components(&[fb(1)], &[fb(1)], &[fb(1)], &[]).unwrap_err();
        assert!(matches!(err, CoreError::CiphertextShape(_)));
    }

    #[test]
    fn active_iff_not_revoked() {
        let mut c = GroupMemberCommitment {
            feed_id: FeedId::new(),
            commitment: Commitment::from_bytes([9; 32]),
            key_generation: 0,
            registered_at: Utc::now(),
            registered_at_block: BlockHeight(1),
            revoked_at_block: None,
        };
        assert!(c.is_active());
        c.revoked_at_block = Some(BlockHeight(2));
        assert!(!c.is_active());
        let plain: FeedMemberCommitment = c.clone().into();
        assert_eq!(plain.commitment, c.commitment);
    }

    #[test]
    fn identity_vote_has_requested_slots() {
        let v = VoteCiphertext::identity(6);
        assert_eq!(v.len(), 6);
        assert!(v.iter().all(|ct| *ct == ElGamalCiphertext::identity()));
    }
}
