//! Shared fixture: one feed with a published key, in-memory storage, the
//! transparent verifier and a manual chain height.

#![allow(dead_code)]

use std::sync::Arc;

use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;

use rxn_core::{Commitment, FeedId, MemberAddress, MerkleRoot, MessageId, Nullifier, VoteCiphertext};
use rxn_crypto::derive::{derive_commitment, derive_nullifier, member_secret};
use rxn_crypto::{encrypt_vote, ElGamalKeypair};
use rxn_service::{
    InMemoryFeedInfo, ManualBlockHeight, MemoryStore, ServiceConfig, ServiceContext,
};
use rxn_state::SubmitReactionRequest;
use rxn_zkp::{mock_prove, MockVerifier, PublicInputs, DEFAULT_CIRCUIT_VERSION};

pub const SLOTS: usize = 6;

pub struct Harness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub feeds: InMemoryFeedInfo,
    pub heights: ManualBlockHeight,
    pub feed: FeedId,
    pub feed_key: ElGamalKeypair,
    pub rng: StdRng,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let store = Arc::new(MemoryStore::new());
        let feeds = InMemoryFeedInfo::new();
        let heights = ManualBlockHeight::starting_at(100);
        let feed = FeedId::new();
        let feed_key = ElGamalKeypair::generate(&mut rng);
        feeds.set_feed_key(feed, feed_key.public_key());

        let ctx = ServiceContext::with_store(
            config,
            store.clone(),
            Arc::new(feeds.clone()),
            Arc::new(MockVerifier),
            Arc::new(heights.clone()),
        );
        Self {
            ctx,
            store,
            feeds,
            heights,
            feed,
            feed_key,
            rng,
        }
    }

    pub fn address(name: &str) -> MemberAddress {
        MemberAddress::new(name).unwrap()
    }

    /// Register a member and advance the chain one block.
    pub async fn join(&self, name: &str) -> Commitment {
        let commitment = derive_commitment(&Self::address(name));
        self.ctx
            .membership
            .register_commitment(&self.feed, &commitment)
            .await
            .unwrap();
        self.heights.advance();
        commitment
    }

    pub fn post_message(&self, author: &Commitment) -> MessageId {
        let message = MessageId::new();
        self.feeds.set_author(self.feed, message, *author);
        message
    }

    pub fn vote(&mut self, slot: usize) -> VoteCiphertext {
        encrypt_vote(&self.feed_key.public_key(), slot, SLOTS, &mut self.rng).unwrap()
    }

    pub fn nullifier(name: &str, message: &MessageId) -> Nullifier {
        derive_nullifier(&member_secret(&Self::address(name)), message)
    }

    pub async fn latest_root(&self) -> MerkleRoot {
        self.ctx
            .membership
            .get_recent_roots(&self.feed, 1)
            .await
            .unwrap()[0]
    }

    /// A request whose proof binds `root`.
    pub fn request_for_root(
        &self,
        name: &str,
        message: MessageId,
        vote: &VoteCiphertext,
        author: Commitment,
        root: MerkleRoot,
    ) -> SubmitReactionRequest {
        let nullifier = Self::nullifier(name, &message);
        let inputs = PublicInputs::new(root, nullifier, vote, self.feed_key.public_key(), author);
        let proof = mock_prove(&inputs, DEFAULT_CIRCUIT_VERSION).unwrap();
        let [c1x, c1y, c2x, c2y] = vote.components();
        SubmitReactionRequest {
            feed_id: self.feed,
            message_id: message,
            nullifier,
            ciphertext_c1x: c1x,
            ciphertext_c1y: c1y,
            ciphertext_c2x: c2x,
            ciphertext_c2y: c2y,
            proof,
            circuit_version: DEFAULT_CIRCUIT_VERSION.to_string(),
            encrypted_backup: None,
        }
    }

    /// A request proved against the latest root.
    pub async fn request(
        &self,
        name: &str,
        message: MessageId,
        vote: &VoteCiphertext,
        author: Commitment,
    ) -> SubmitReactionRequest {
        let root = self.latest_root().await;
        self.request_for_root(name, message, vote, author, root)
    }

    pub async fn decrypted_tally(&self, message: &MessageId) -> Vec<Option<u64>> {
        let tallies = self
            .ctx
            .queries
            .get_tallies(&self.feed, &[*message])
            .await
            .unwrap();
        self.feed_key
            .decrypt_tally(&tallies[message].tally, 64)
            .unwrap()
    }
}
