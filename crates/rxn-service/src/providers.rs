//! # External Collaborators
//!
//! The reaction pipeline reads two facts it does not own: a feed's
//! ElGamal public key and the author commitment of a message. Membership
//! mutations additionally need the current chain height. Both sources are
//! traits so hosts can back them with whatever system owns that data.
//!
//! The in-memory implementations serve tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use rxn_core::{BlockHeight, Commitment, CurvePoint, FeedId, MessageId};

use crate::error::ServiceError;

/// Source of feed keys and message authorship.
#[async_trait]
pub trait FeedInfoProvider: Send + Sync {
    /// The feed's ElGamal public key, or `None` if the feed is unknown.
    async fn feed_public_key(&self, feed_id: &FeedId) -> Result<Option<CurvePoint>, ServiceError>;

    /// Commitment of the message's author, or `None` if the message is
    /// unknown in that feed.
    async fn author_commitment(
        &self,
        feed_id: &FeedId,
        message_id: &MessageId,
    ) -> Result<Option<Commitment>, ServiceError>;
}

/// Source of the current chain height.
#[async_trait]
pub trait BlockHeightSource: Send + Sync {
    /// The height new rows are stamped with.
    async fn current_height(&self) -> Result<BlockHeight, ServiceError>;
}

/// Feed info held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeedInfo {
    keys: Arc<RwLock<HashMap<FeedId, CurvePoint>>>,
    authors: Arc<RwLock<HashMap<(FeedId, MessageId), Commitment>>>,
}

impl InMemoryFeedInfo {
    /// Empty provider: every feed and message is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or rotate) a feed key.
    pub fn set_feed_key(&self, feed_id: FeedId, key: CurvePoint) {
        self.keys.write().insert(feed_id, key);
    }

    /// Record a message and its author.
    pub fn set_author(&self, feed_id: FeedId, message_id: MessageId, author: Commitment) {
        self.authors.write().insert((feed_id, message_id), author);
    }
}

#[async_trait]
impl FeedInfoProvider for InMemoryFeedInfo {
    async fn feed_public_key(&self, feed_id: &FeedId) -> Result<Option<CurvePoint>, ServiceError> {
        Ok(self.keys.read().get(feed_id).copied())
    }

    async fn author_commitment(
        &self,
        feed_id: &FeedId,
        message_id: &MessageId,
    ) -> Result<Option<Commitment>, ServiceError> {
        Ok(self.authors.read().get(&(*feed_id, *message_id)).copied())
    }
}

/// A chain height that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualBlockHeight {
    height: Arc<AtomicU64>,
}

impl ManualBlockHeight {
    /// Start at `height`.
    pub fn starting_at(height: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(height)),
        }
    }

    /// Jump to `height`.
    pub fn set(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// Advance by one block and return the new height.
    pub fn advance(&self) -> BlockHeight {
        BlockHeight(self.height.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl BlockHeightSource for ManualBlockHeight {
    async fn current_height(&self) -> Result<BlockHeight, ServiceError> {
        Ok(BlockHeight(self.height.load(Ordering::SeqCst)))
    }
}
