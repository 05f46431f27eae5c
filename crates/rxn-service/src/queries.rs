//! Read-side queries over reactions.

use std::collections::HashMap;
use std::sync::Arc;

use rxn_core::{FeedId, MessageId, MessageReactionTally, Nullifier, ReactionTransaction};

use crate::error::ServiceError;
use crate::store::ReactionRepository;

/// Nullifier, backup and tally lookups.
#[derive(Clone)]
pub struct ReactionQueryService {
    reactions: Arc<dyn ReactionRepository>,
}

impl std::fmt::Debug for ReactionQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionQueryService").finish_non_exhaustive()
    }
}

impl ReactionQueryService {
    pub fn new(reactions: Arc<dyn ReactionRepository>) -> Self {
        Self { reactions }
    }

    /// Whether a reaction was recorded under `nullifier`.
    pub async fn nullifier_exists(&self, nullifier: &Nullifier) -> Result<bool, ServiceError> {
        Ok(self.reactions.get_nullifier(nullifier).await?.is_some())
    }

    /// The client's encrypted backup stored with the reaction, if any.
    pub async fn get_reaction_backup(
        &self,
        nullifier: &Nullifier,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self
            .reactions
            .get_nullifier(nullifier)
            .await?
            .and_then(|row| row.encrypted_backup))
    }

    /// Tallies keyed by message. Messages without reactions are absent,
    /// never zero-filled.
    #[tracing::instrument(skip_all, fields(feed = %feed_id, requested = message_ids.len()))]
    pub async fn get_tallies(
        &self,
        feed_id: &FeedId,
        message_ids: &[MessageId],
    ) -> Result<HashMap<MessageId, MessageReactionTally>, ServiceError> {
        let tallies = self.reactions.get_tallies(feed_id, message_ids).await?;
        Ok(tallies.into_iter().map(|t| (t.message_id, t)).collect())
    }

    /// Audit rows of a message, oldest first.
    pub async fn get_transactions(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<ReactionTransaction>, ServiceError> {
        Ok(self.reactions.transactions_for(message_id).await?)
    }
}
