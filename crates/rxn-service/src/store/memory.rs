//! # In-Memory Store
//!
//! Implements every repository over process memory. The locks are
//! `parking_lot` and are never held across `.await`, so every trait method
//! is a synchronous critical section wrapped in an async signature.
//!
//! Membership state of all feeds sits behind one lock; that serializes
//! root recomputation per feed (and, conservatively, across feeds).
//! Reaction tables share a second lock so a write set lands atomically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use rxn_core::{
    BlockHeight, Commitment, FeedId, GroupMemberCommitment, MerkleRoot, MerkleRootHistory,
    MessageId, MessageReactionTally, Nullifier, ReactionNullifier, ReactionTransaction,
};
use rxn_state::ReactionWrite;

use super::{
    root_over, CommitmentRepository, EventApplied, MembershipChange, ReactionRepository,
    RegisterOutcome, RootHistoryRepository,
};
use crate::error::StorageError;
use crate::events::EventId;

#[derive(Debug, Default)]
struct FeedMembership {
    commitments: BTreeMap<Commitment, GroupMemberCommitment>,
    roots: Vec<MerkleRootHistory>,
}

impl FeedMembership {
    fn active(&self) -> Vec<Commitment> {
        self.commitments
            .values()
            .filter(|c| c.is_active())
            .map(|c| c.commitment)
            .collect()
    }

    fn is_active(&self, commitment: &Commitment) -> bool {
        self.commitments
            .get(commitment)
            .is_some_and(GroupMemberCommitment::is_active)
    }

    fn latest_root(&self) -> Option<MerkleRoot> {
        self.roots.last().map(|h| h.root)
    }

    fn push_root(&mut self, feed_id: FeedId, root: MerkleRoot, height: BlockHeight) {
        self.roots.push(MerkleRootHistory {
            feed_id,
            root,
            block_height: height,
            created_at: Utc::now(),
        });
    }

    fn append_root(
        &mut self,
        feed_id: FeedId,
        height: BlockHeight,
    ) -> Result<MerkleRoot, StorageError> {
        let root = root_over(&self.active())?;
        self.push_root(feed_id, root, height);
        Ok(root)
    }

    /// Insert or reactivate. The root is computed before any row changes,
    /// so a commitment that cannot be a leaf leaves the feed untouched.
    fn activate(
        &mut self,
        feed_id: FeedId,
        commitment: &Commitment,
        key_generation: u32,
        height: BlockHeight,
    ) -> Result<RegisterOutcome, StorageError> {
        if self.is_active(commitment) {
            return Ok(RegisterOutcome::AlreadyActive {
                root: self.latest_root(),
            });
        }
        let mut next = self.active();
        next.push(*commitment);
        let root = root_over(&next)?;

        let reactivated = match self.commitments.get_mut(commitment) {
            Some(row) => {
                row.revoked_at_block = None;
                row.registered_at_block = height;
                row.key_generation = key_generation;
                true
            }
            None => {
                self.commitments.insert(
                    *commitment,
                    GroupMemberCommitment {
                        feed_id,
                        commitment: *commitment,
                        key_generation,
                        registered_at: Utc::now(),
                        registered_at_block: height,
                        revoked_at_block: None,
                    },
                );
                false
            }
        };
        self.push_root(feed_id, root, height);
        Ok(RegisterOutcome::Registered { root, reactivated })
    }

    /// Revoke and append the new root. When the commitment is already
    /// inactive, append only if the latest root is out of date.
    fn deactivate(
        &mut self,
        feed_id: FeedId,
        commitment: &Commitment,
        height: BlockHeight,
    ) -> Result<Option<MerkleRoot>, StorageError> {
        if !self.is_active(commitment) {
            let Some(latest) = self.latest_root() else {
                return Ok(None);
            };
            let current = root_over(&self.active())?;
            if latest == current {
                return Ok(None);
            }
            self.push_root(feed_id, current, height);
            return Ok(Some(current));
        }

        let remaining: Vec<Commitment> = self
            .active()
            .into_iter()
            .filter(|c| c != commitment)
            .collect();
        let root = root_over(&remaining)?;
        if let Some(row) = self.commitments.get_mut(commitment) {
            row.revoked_at_block = Some(height);
        }
        self.push_root(feed_id, root, height);
        Ok(Some(root))
    }
}

#[derive(Debug, Default)]
struct MembershipTables {
    feeds: HashMap<FeedId, FeedMembership>,
    processed_events: HashSet<EventId>,
}

#[derive(Debug, Default)]
struct ReactionTables {
    nullifiers: HashMap<Nullifier, ReactionNullifier>,
    tallies: HashMap<MessageId, MessageReactionTally>,
    transactions: Vec<ReactionTransaction>,
}

/// Thread-safe, cloneable in-memory implementation of all repositories.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    membership: Arc<RwLock<MembershipTables>>,
    reactions: Arc<RwLock<ReactionTables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total audit rows across all messages.
    pub fn transaction_count(&self) -> usize {
        self.reactions.read().transactions.len()
    }

    /// Number of history rows of a feed.
    pub fn root_history_len(&self, feed_id: &FeedId) -> usize {
        self.membership
            .read()
            .feeds
            .get(feed_id)
            .map_or(0, |m| m.roots.len())
    }
}

#[async_trait]
impl CommitmentRepository for MemoryStore {
    async fn get_commitment(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<Option<GroupMemberCommitment>, StorageError> {
        Ok(self
            .membership
            .read()
            .feeds
            .get(feed_id)
            .and_then(|m| m.commitments.get(commitment).cloned()))
    }

    async fn active_commitments(&self, feed_id: &FeedId) -> Result<Vec<Commitment>, StorageError> {
        Ok(self
            .membership
            .read()
            .feeds
            .get(feed_id)
            .map(FeedMembership::active)
            .unwrap_or_default())
    }

    async fn register(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        key_generation: u32,
        height: BlockHeight,
    ) -> Result<RegisterOutcome, StorageError> {
        self.membership
            .write()
            .feeds
            .entry(*feed_id)
            .or_default()
            .activate(*feed_id, commitment, key_generation, height)
    }

    async fn revoke(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        height: BlockHeight,
    ) -> Result<bool, StorageError> {
        let mut guard = self.membership.write();
        let Some(row) = guard
            .feeds
            .get_mut(feed_id)
            .and_then(|m| m.commitments.get_mut(commitment))
        else {
            return Ok(false);
        };
        if !row.is_active() {
            return Ok(false);
        }
        row.revoked_at_block = Some(height);
        Ok(true)
    }

    async fn record_root(
        &self,
        feed_id: &FeedId,
        height: BlockHeight,
    ) -> Result<MerkleRoot, StorageError> {
        self.membership
            .write()
            .feeds
            .entry(*feed_id)
            .or_default()
            .append_root(*feed_id, height)
    }

    async fn apply_event(
        &self,
        event_id: &EventId,
        feed_id: &FeedId,
        commitment: &Commitment,
        change: MembershipChange,
        height: BlockHeight,
    ) -> Result<EventApplied, StorageError> {
        let mut guard = self.membership.write();
        let tables = &mut *guard;
        if tables.processed_events.contains(event_id) {
            return Ok(EventApplied::Duplicate);
        }
        let feed = tables.feeds.entry(*feed_id).or_default();
        let applied = match change {
            MembershipChange::Activate { key_generation } => {
                EventApplied::Registered(feed.activate(*feed_id, commitment, key_generation, height)?)
            }
            MembershipChange::Revoke => match feed.deactivate(*feed_id, commitment, height)? {
                Some(root) => EventApplied::Revoked { root },
                None => EventApplied::NotActive,
            },
        };
        tables.processed_events.insert(*event_id);
        Ok(applied)
    }

    async fn is_event_processed(&self, event_id: &EventId) -> Result<bool, StorageError> {
        Ok(self.membership.read().processed_events.contains(event_id))
    }
}

#[async_trait]
impl RootHistoryRepository for MemoryStore {
    async fn recent_history(
        &self,
        feed_id: &FeedId,
        count: usize,
    ) -> Result<Vec<MerkleRootHistory>, StorageError> {
        Ok(self
            .membership
            .read()
            .feeds
            .get(feed_id)
            .map(|m| m.roots.iter().rev().take(count).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReactionRepository for MemoryStore {
    async fn get_nullifier(
        &self,
        nullifier: &Nullifier,
    ) -> Result<Option<ReactionNullifier>, StorageError> {
        Ok(self.reactions.read().nullifiers.get(nullifier).cloned())
    }

    async fn get_tally(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<MessageReactionTally>, StorageError> {
        Ok(self.reactions.read().tallies.get(message_id).cloned())
    }

    async fn get_tallies(
        &self,
        feed_id: &FeedId,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReactionTally>, StorageError> {
        let guard = self.reactions.read();
        Ok(message_ids
            .iter()
            .filter_map(|id| guard.tallies.get(id))
            .filter(|t| t.feed_id == *feed_id)
            .cloned()
            .collect())
    }

    async fn commit_reaction(&self, write: &ReactionWrite) -> Result<(), StorageError> {
        let mut guard = self.reactions.write();
        let tables = &mut *guard;

        let stored_nullifier = tables.nullifiers.get(&write.nullifier.nullifier);
        match (write.is_new_nullifier, stored_nullifier) {
            (true, Some(_)) => {
                return Err(StorageError::Conflict(format!(
                    "nullifier {} already recorded",
                    write.nullifier.nullifier
                )))
            }
            (false, None) => {
                return Err(StorageError::Conflict(format!(
                    "nullifier {} disappeared",
                    write.nullifier.nullifier
                )))
            }
            _ => {}
        }

        let stored_version = tables.tallies.get(&write.tally.message_id).map(|t| t.version);
        if stored_version != write.expected_tally_version {
            return Err(StorageError::Conflict(format!(
                "tally of {} is at version {stored_version:?}, expected {:?}",
                write.tally.message_id, write.expected_tally_version
            )));
        }

        tables
            .nullifiers
            .insert(write.nullifier.nullifier, write.nullifier.clone());
        tables
            .tallies
            .insert(write.tally.message_id, write.tally.clone());
        tables.transactions.push(write.transaction.clone());
        Ok(())
    }

    async fn transactions_for(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<ReactionTransaction>, StorageError> {
        Ok(self
            .reactions
            .read()
            .transactions
            .iter()
            .filter(|t| t.message_id == *message_id)
            .cloned()
            .collect())
    }
}
