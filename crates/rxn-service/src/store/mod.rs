//! # Repositories
//!
//! Persistence seams of the reaction services. Each trait is object-safe
//! and used as `Arc<dyn …>`, so the same services run over the in-memory
//! store in tests and over Postgres in deployment.
//!
//! ## Atomicity Contracts
//!
//! - [`CommitmentRepository::register`] and
//!   [`CommitmentRepository::record_root`] recompute the root from the
//!   active set as read *inside* the same critical section that appends
//!   the history row. Concurrent mutations of one feed serialize there.
//! - [`CommitmentRepository::apply_event`] records the event id, changes
//!   the commitment and appends the resulting root in one critical section.
//!   A failure anywhere leaves all three untouched, so a redelivered event
//!   starts from the same state as the first delivery.
//! - [`ReactionRepository::commit_reaction`] applies a whole
//!   [`ReactionWrite`] or nothing. A tally whose version moved since it was
//!   read, or a "new" nullifier that already exists, yields
//!   [`StorageError::Conflict`] so the caller can re-read and retry.

pub mod memory;

use async_trait::async_trait;

use rxn_core::{
    BlockHeight, Commitment, FeedId, GroupMemberCommitment, MerkleRoot, MerkleRootHistory,
    MessageId, MessageReactionTally, Nullifier, ReactionNullifier, ReactionTransaction,
};
use rxn_crypto::{CryptoError, MembershipTree};
use rxn_state::ReactionWrite;

use crate::error::StorageError;
use crate::events::EventId;

pub use memory::MemoryStore;

/// Root of the tree over `active` (order irrelevant).
pub fn root_over(active: &[Commitment]) -> Result<MerkleRoot, CryptoError> {
    Ok(MembershipTree::from_commitments(active)?.root())
}

/// What a registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The commitment was already active; nothing changed.
    AlreadyActive {
        /// Latest recorded root, if any root was ever recorded.
        root: Option<MerkleRoot>,
    },
    /// The commitment is now active and a root was appended.
    Registered {
        /// Root over the new active set.
        root: MerkleRoot,
        /// Whether a revoked row was brought back rather than inserted.
        reactivated: bool,
    },
}

/// Membership change carried by an upstream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// Insert or reactivate the commitment.
    Activate { key_generation: u32 },
    /// Revoke the commitment.
    Revoke,
}

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventApplied {
    /// The event id was recorded before; nothing changed.
    Duplicate,
    /// Result of an activation.
    Registered(RegisterOutcome),
    /// The commitment is no longer in the latest root.
    ///
    /// Also returned when the commitment was already revoked but the
    /// latest recorded root still predates that revocation; the missing
    /// root is appended then.
    Revoked { root: MerkleRoot },
    /// The commitment was not active and the history is current.
    NotActive,
}

/// Per-feed membership commitments.
#[async_trait]
pub trait CommitmentRepository: Send + Sync {
    /// Fetch one commitment row, active or revoked.
    async fn get_commitment(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<Option<GroupMemberCommitment>, StorageError>;

    /// Active commitments of a feed in canonical (byte) order.
    async fn active_commitments(&self, feed_id: &FeedId) -> Result<Vec<Commitment>, StorageError>;

    /// Activate `commitment` (insert or reactivate) and append the new root.
    ///
    /// No-op when it is already active.
    async fn register(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        key_generation: u32,
        height: BlockHeight,
    ) -> Result<RegisterOutcome, StorageError>;

    /// Mark `commitment` revoked at `height`. Returns whether an active row
    /// changed. Does not append a root.
    async fn revoke(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        height: BlockHeight,
    ) -> Result<bool, StorageError>;

    /// Recompute the root over the current active set and append it.
    async fn record_root(
        &self,
        feed_id: &FeedId,
        height: BlockHeight,
    ) -> Result<MerkleRoot, StorageError>;

    /// Apply one membership event atomically: record `event_id`, apply
    /// `change` and append the root when the active set moved.
    async fn apply_event(
        &self,
        event_id: &EventId,
        feed_id: &FeedId,
        commitment: &Commitment,
        change: MembershipChange,
        height: BlockHeight,
    ) -> Result<EventApplied, StorageError>;

    /// Whether `event_id` was applied before.
    async fn is_event_processed(&self, event_id: &EventId) -> Result<bool, StorageError>;
}

/// Append-only root history reads.
#[async_trait]
pub trait RootHistoryRepository: Send + Sync {
    /// Up to `count` most recent history rows, newest first.
    async fn recent_history(
        &self,
        feed_id: &FeedId,
        count: usize,
    ) -> Result<Vec<MerkleRootHistory>, StorageError>;

    /// Up to `count` most recent roots, newest first.
    async fn recent_roots(
        &self,
        feed_id: &FeedId,
        count: usize,
    ) -> Result<Vec<MerkleRoot>, StorageError> {
        Ok(self
            .recent_history(feed_id, count)
            .await?
            .into_iter()
            .map(|h| h.root)
            .collect())
    }
}

/// Nullifiers, tallies and the reaction audit log.
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// The stored vote for a nullifier.
    async fn get_nullifier(
        &self,
        nullifier: &Nullifier,
    ) -> Result<Option<ReactionNullifier>, StorageError>;

    /// The tally of one message.
    async fn get_tally(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<MessageReactionTally>, StorageError>;

    /// Tallies of the given messages within `feed_id`. Messages without a
    /// tally (or from another feed) are simply absent.
    async fn get_tallies(
        &self,
        feed_id: &FeedId,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReactionTally>, StorageError>;

    /// Apply a write set atomically.
    async fn commit_reaction(&self, write: &ReactionWrite) -> Result<(), StorageError>;

    /// Audit rows of a message, oldest first.
    async fn transactions_for(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<ReactionTransaction>, StorageError>;
}
