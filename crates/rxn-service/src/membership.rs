//! # Membership Service
//!
//! Per-feed membership: registration, revocation, inclusion proofs and
//! root history. The tree is rebuilt from the active set on every proof
//! request; roots are appended to history only by registration and
//! [`MembershipService::update_root`].
//!
//! ## Revocation
//!
//! Revoking only marks the commitment. It leaves the tree (and therefore
//! proofs) immediately, but no root is recorded until the next
//! `update_root`; older roots stay in history and keep verifying proofs
//! made against them while they remain in the window.
//!
//! Upstream membership events go through [`MembershipService::apply_event`]
//! instead, which revokes and records the root in one repository step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rxn_core::{BlockHeight, Commitment, FeedId, FieldBytes, MerkleRoot, TREE_DEPTH};
use rxn_crypto::{FieldEncoding, MembershipPath, MembershipTree};

use crate::error::ServiceError;
use crate::events::EventId;
use crate::providers::BlockHeightSource;
use crate::store::{
    CommitmentRepository, EventApplied, MembershipChange, RegisterOutcome, RootHistoryRepository,
};
use crate::telemetry;

/// Result of [`MembershipService::register_commitment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommitmentResult {
    /// The commitment is active after the call.
    pub success: bool,
    /// It was already active; nothing was written.
    pub already_registered: bool,
    /// New root, or the latest recorded root when already registered.
    pub root: Option<MerkleRoot>,
}

/// Inclusion proof of a commitment in a feed's current tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Whether the commitment is an active member.
    pub is_member: bool,
    /// Root the path leads to.
    pub root: Option<MerkleRoot>,
    /// Sibling at each level, leaf first.
    pub path_elements: Option<Vec<FieldBytes>>,
    /// 0 if the node is a left child at that level, 1 if right.
    pub path_indices: Option<Vec<u8>>,
    /// Always [`TREE_DEPTH`].
    pub tree_depth: usize,
}

impl MembershipProof {
    fn non_member() -> Self {
        Self {
            is_member: false,
            root: None,
            path_elements: None,
            path_indices: None,
            tree_depth: TREE_DEPTH,
        }
    }

    /// The path in the form [`rxn_crypto::verify_membership_proof`] takes.
    pub fn path(&self) -> Option<MembershipPath> {
        Some(MembershipPath {
            elements: self.path_elements.clone()?,
            indices: self.path_indices.clone()?,
        })
    }
}

/// Whether `proof` shows `commitment` under the proof's own root.
pub fn verify_membership_proof(commitment: &Commitment, proof: &MembershipProof) -> bool {
    match (proof.is_member, proof.root, proof.path()) {
        (true, Some(root), Some(path)) => {
            rxn_crypto::verify_membership_proof(commitment, &path, &root)
        }
        _ => false,
    }
}

/// Membership tree operations over the repositories.
#[derive(Clone)]
pub struct MembershipService {
    commitments: Arc<dyn CommitmentRepository>,
    roots: Arc<dyn RootHistoryRepository>,
    heights: Arc<dyn BlockHeightSource>,
}

impl std::fmt::Debug for MembershipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipService").finish_non_exhaustive()
    }
}

impl MembershipService {
    pub fn new(
        commitments: Arc<dyn CommitmentRepository>,
        roots: Arc<dyn RootHistoryRepository>,
        heights: Arc<dyn BlockHeightSource>,
    ) -> Self {
        Self {
            commitments,
            roots,
            heights,
        }
    }

    /// Register under key generation 0.
    pub async fn register_commitment(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<RegisterCommitmentResult, ServiceError> {
        self.register_with_generation(feed_id, commitment, 0).await
    }

    /// Activate a commitment and record the resulting root. Idempotent.
    #[tracing::instrument(skip_all, fields(feed = %feed_id))]
    pub async fn register_with_generation(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        key_generation: u32,
    ) -> Result<RegisterCommitmentResult, ServiceError> {
        commitment.to_field()?;
        let height = self.heights.current_height().await?;
        let outcome = self
            .commitments
            .register(feed_id, commitment, key_generation, height)
            .await?;

        Ok(match outcome {
            RegisterOutcome::AlreadyActive { root } => {
                tracing::debug!("commitment already registered");
                RegisterCommitmentResult {
                    success: true,
                    already_registered: true,
                    root,
                }
            }
            RegisterOutcome::Registered { root, reactivated } => {
                let kind = if reactivated { "reactivate" } else { "register" };
                telemetry::membership_mutation(kind);
                tracing::info!(%root, %height, reactivated, "commitment registered");
                RegisterCommitmentResult {
                    success: true,
                    already_registered: false,
                    root: Some(root),
                }
            }
        })
    }

    /// Whether `commitment` is an active member.
    pub async fn is_registered(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<bool, ServiceError> {
        Ok(self
            .commitments
            .get_commitment(feed_id, commitment)
            .await?
            .is_some_and(|row| row.is_active()))
    }

    /// Inclusion proof against the tree over the current active set.
    #[tracing::instrument(skip_all, fields(feed = %feed_id))]
    pub async fn get_membership_proof(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<MembershipProof, ServiceError> {
        let active = self.commitments.active_commitments(feed_id).await?;
        if !active.contains(commitment) {
            return Ok(MembershipProof::non_member());
        }
        let tree = MembershipTree::from_commitments(&active)?;
        let Some(path) = tree.proof_for(commitment) else {
            return Ok(MembershipProof::non_member());
        };
        Ok(MembershipProof {
            is_member: true,
            root: Some(tree.root()),
            path_elements: Some(path.elements),
            path_indices: Some(path.indices),
            tree_depth: TREE_DEPTH,
        })
    }

    /// Recompute the root over the active set and append it at `height`.
    #[tracing::instrument(skip_all, fields(feed = %feed_id))]
    pub async fn update_root(
        &self,
        feed_id: &FeedId,
        height: BlockHeight,
    ) -> Result<MerkleRoot, ServiceError> {
        let root = self.commitments.record_root(feed_id, height).await?;
        tracing::info!(%root, %height, "root recorded");
        Ok(root)
    }

    /// Up to `count` roots, most recent first.
    pub async fn get_recent_roots(
        &self,
        feed_id: &FeedId,
        count: usize,
    ) -> Result<Vec<MerkleRoot>, ServiceError> {
        Ok(self.roots.recent_roots(feed_id, count).await?)
    }

    /// Mark a commitment revoked at the current height. Returns whether an
    /// active commitment changed. Call [`Self::update_root`] afterwards.
    #[tracing::instrument(skip_all, fields(feed = %feed_id))]
    pub async fn revoke_commitment(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<bool, ServiceError> {
        let height = self.heights.current_height().await?;
        let changed = self.commitments.revoke(feed_id, commitment, height).await?;
        if changed {
            telemetry::membership_mutation("revoke");
            tracing::info!(%height, "commitment revoked");
        }
        Ok(changed)
    }

    /// Apply an upstream event's change at the current height.
    ///
    /// The event id, the commitment change and the new root are stored
    /// together; when this fails nothing was stored.
    #[tracing::instrument(skip_all, fields(feed = %feed_id, event = %event_id))]
    pub async fn apply_event(
        &self,
        event_id: &EventId,
        feed_id: &FeedId,
        commitment: &Commitment,
        change: MembershipChange,
    ) -> Result<EventApplied, ServiceError> {
        if matches!(change, MembershipChange::Activate { .. }) {
            commitment.to_field()?;
        }
        let height = self.heights.current_height().await?;
        let applied = self
            .commitments
            .apply_event(event_id, feed_id, commitment, change, height)
            .await?;
        match &applied {
            EventApplied::Registered(RegisterOutcome::Registered { reactivated, .. }) => {
                telemetry::membership_mutation(if *reactivated { "reactivate" } else { "register" });
            }
            EventApplied::Revoked { root } => {
                telemetry::membership_mutation("revoke");
                tracing::info!(%root, %height, "commitment revoked, root recorded");
            }
            _ => {}
        }
        Ok(applied)
    }

    /// Whether an upstream event was applied before.
    pub async fn is_event_processed(&self, event_id: &EventId) -> Result<bool, ServiceError> {
        Ok(self.commitments.is_event_processed(event_id).await?)
    }

    /// Current chain height from the configured source.
    pub async fn current_height(&self) -> Result<BlockHeight, ServiceError> {
        self.heights.current_height().await
    }
}
