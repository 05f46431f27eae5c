mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Harness, SLOTS};
use rxn_core::{FeedId, FieldBytes, MessageId};
use rxn_service::{ServiceConfig, ServiceContext, ServiceError};
use rxn_state::{ReactionErrorCode, SubmitReactionResult};
use rxn_zkp::{PublicInputs, VerificationOutcome, VerifyError, ZkVerifier};

fn assert_rejected(result: &SubmitReactionResult, code: ReactionErrorCode) {
    assert!(!result.success, "expected {code:?}, got success");
    assert_eq!(result.error_code, Some(code));
    assert!(result.transaction_id.is_none());
}

fn one_hot(slot: usize) -> Vec<Option<u64>> {
    (0..SLOTS).map(|i| Some(u64::from(i == slot))).collect()
}

#[tokio::test]
async fn first_reaction_is_folded_into_a_new_tally() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    h.join("bob").await;
    let msg = h.post_message(&alice);

    let vote = h.vote(2);
    let req = h.request("bob", msg, &vote, alice).await;
    let result = h.ctx.reactions.submit_reaction(req).await.unwrap();
    assert!(result.success);
    assert!(result.error_code.is_none());
    let tx = result.transaction_id.unwrap();

    assert_eq!(h.decrypted_tally(&msg).await, one_hot(2));
    let tallies = h.ctx.queries.get_tallies(&h.feed, &[msg]).await.unwrap();
    assert_eq!(tallies[&msg].total_count, 1);
    assert_eq!(tallies[&msg].version, 1);

    let nullifier = Harness::nullifier("bob", &msg);
    assert!(h.ctx.queries.nullifier_exists(&nullifier).await.unwrap());
    let audit = h.ctx.queries.get_transactions(&msg).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].id, tx);
    assert_eq!(audit[0].nullifier, nullifier);
    assert_eq!(audit[0].ciphertext, vote);
}

#[tokio::test]
async fn resubmission_replaces_the_vote_without_recounting() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    h.join("bob").await;
    let msg = h.post_message(&alice);

    let first = h.vote(1);
    let req = h.request("bob", msg, &first, alice).await;
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);

    let second = h.vote(4);
    let req = h.request("bob", msg, &second, alice).await;
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);

    let tallies = h.ctx.queries.get_tallies(&h.feed, &[msg]).await.unwrap();
    assert_eq!(tallies[&msg].total_count, 1);
    assert_eq!(tallies[&msg].version, 2);
    assert_eq!(h.decrypted_tally(&msg).await, one_hot(4));
    assert_eq!(h.ctx.queries.get_transactions(&msg).await.unwrap().len(), 2);
}

#[tokio::test]
async fn tally_is_the_sum_of_member_votes() {
    let mut h = Harness::new();
    let author = h.join("author").await;
    let voters = [("v1", 0), ("v2", 3), ("v3", 3), ("v4", 5)];
    for (name, _) in voters {
        h.join(name).await;
    }
    let msg = h.post_message(&author);
    for (name, slot) in voters {
        let vote = h.vote(slot);
        let req = h.request(name, msg, &vote, author).await;
        assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);
    }
    let counts = h.decrypted_tally(&msg).await;
    assert_eq!(counts, vec![Some(1), Some(0), Some(0), Some(2), Some(0), Some(1)]);
    let tallies = h.ctx.queries.get_tallies(&h.feed, &[msg]).await.unwrap();
    assert_eq!(tallies[&msg].total_count, 4);
}

#[tokio::test]
async fn shape_is_checked_before_any_lookup() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let vote = h.vote(0);

    let mut short = h.request("alice", msg, &vote, alice).await;
    short.feed_id = FeedId::new();
    short.message_id = MessageId::new();
    short.ciphertext_c2y.pop();
    let result = h.ctx.reactions.submit_reaction(short).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidCiphertextSize);

    let mut off_curve = h.request("alice", msg, &vote, alice).await;
    off_curve.feed_id = FeedId::new();
    off_curve.ciphertext_c1x[0] = FieldBytes::from_bytes([0xff; 32]);
    let result = h.ctx.reactions.submit_reaction(off_curve).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidCiphertextPoint);
}

#[tokio::test]
async fn gates_fire_in_order() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let vote = h.vote(0);

    let mut unknown_feed = h.request("alice", msg, &vote, alice).await;
    unknown_feed.feed_id = FeedId::new();
    unknown_feed.message_id = MessageId::new();
    let result = h.ctx.reactions.submit_reaction(unknown_feed).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::FeedNotFound);

    let mut unknown_message = h.request("alice", msg, &vote, alice).await;
    unknown_message.message_id = MessageId::new();
    let result = h.ctx.reactions.submit_reaction(unknown_message).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::MessageNotFound);

    // A feed with a key and a message but no membership history.
    let empty_feed = FeedId::new();
    h.feeds.set_feed_key(empty_feed, h.feed_key.public_key());
    let lonely = MessageId::new();
    h.feeds.set_author(empty_feed, lonely, alice);
    let mut no_roots = h.request("alice", lonely, &vote, alice).await;
    no_roots.feed_id = empty_feed;
    let result = h.ctx.reactions.submit_reaction(no_roots).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::NoMerkleRoots);

    let mut bad_proof = h.request("alice", msg, &vote, alice).await;
    bad_proof.proof[0] ^= 0x01;
    let result = h.ctx.reactions.submit_reaction(bad_proof).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidProof);
    assert!(result.error_message.unwrap().contains("PROOF_MISMATCH"));

    assert!(h.ctx.queries.get_tallies(&h.feed, &[msg]).await.unwrap().is_empty());
}

#[tokio::test]
async fn proof_for_an_older_root_in_the_window_is_accepted() {
    let config = ServiceConfig {
        root_window: 2,
        ..ServiceConfig::default()
    };
    let mut h = Harness::with_config(config);
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let old_root = h.latest_root().await;
    h.join("bob").await;

    let vote = h.vote(1);
    let req = h.request_for_root("alice", msg, &vote, alice, old_root);
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);

    // Two more roots push `old_root` out of the window.
    h.join("carol").await;
    h.join("dave").await;
    let vote = h.vote(3);
    let req = h.request_for_root("alice", msg, &vote, alice, old_root);
    let result = h.ctx.reactions.submit_reaction(req).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidProof);
}

#[tokio::test]
async fn failed_proof_is_not_remembered() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let vote = h.vote(0);

    let mut bad = h.request("alice", msg, &vote, alice).await;
    bad.proof.truncate(4);
    let result = h.ctx.reactions.submit_reaction(bad).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidProof);

    let good = h.request("alice", msg, &vote, alice).await;
    assert!(h.ctx.reactions.submit_reaction(good).await.unwrap().success);
}

#[tokio::test]
async fn nullifier_cannot_move_to_another_message() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let first = h.post_message(&alice);
    let second = h.post_message(&alice);

    let vote = h.vote(0);
    let req = h.request("alice", first, &vote, alice).await;
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);

    // Nullifier of `first` presented for `second`.
    let mut reused = h.request("alice", second, &vote, alice).await;
    reused.nullifier = Harness::nullifier("alice", &first);
    let inputs = PublicInputs::new(
        h.latest_root().await,
        reused.nullifier,
        &vote,
        h.feed_key.public_key(),
        alice,
    );
    reused.proof = rxn_zkp::mock_prove(&inputs, &reused.circuit_version).unwrap();
    let result = h.ctx.reactions.submit_reaction(reused).await.unwrap();
    assert_rejected(&result, ReactionErrorCode::InvalidProof);

    assert_eq!(h.decrypted_tally(&first).await, one_hot(0));
    assert!(h.ctx.queries.get_tallies(&h.feed, &[second]).await.unwrap().is_empty());
}

#[tokio::test]
async fn backup_is_stored_and_replaced() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let nullifier = Harness::nullifier("alice", &msg);

    assert!(!h.ctx.queries.nullifier_exists(&nullifier).await.unwrap());
    assert!(h.ctx.queries.get_reaction_backup(&nullifier).await.unwrap().is_none());

    let vote = h.vote(0);
    let mut req = h.request("alice", msg, &vote, alice).await;
    req.encrypted_backup = Some(b"sealed:thumbs-up".to_vec());
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);
    assert_eq!(
        h.ctx.queries.get_reaction_backup(&nullifier).await.unwrap(),
        Some(b"sealed:thumbs-up".to_vec())
    );

    let vote = h.vote(5);
    let mut req = h.request("alice", msg, &vote, alice).await;
    req.encrypted_backup = Some(b"sealed:heart".to_vec());
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);
    assert_eq!(
        h.ctx.queries.get_reaction_backup(&nullifier).await.unwrap(),
        Some(b"sealed:heart".to_vec())
    );
}

#[tokio::test]
async fn tallies_omit_messages_without_reactions() {
    let mut h = Harness::new();
    let alice = h.join("alice").await;
    let liked = h.post_message(&alice);
    let ignored = h.post_message(&alice);

    let vote = h.vote(0);
    let req = h.request("alice", liked, &vote, alice).await;
    assert!(h.ctx.reactions.submit_reaction(req).await.unwrap().success);

    let tallies = h
        .ctx
        .queries
        .get_tallies(&h.feed, &[liked, ignored, MessageId::new()])
        .await
        .unwrap();
    assert_eq!(tallies.len(), 1);
    assert!(tallies.contains_key(&liked));
    assert!(!tallies.contains_key(&ignored));
}

struct UnavailableVerifier;

#[async_trait]
impl ZkVerifier for UnavailableVerifier {
    async fn verify(
        &self,
        _proof: &[u8],
        _inputs: &PublicInputs,
        _circuit_version: &str,
    ) -> Result<VerificationOutcome, VerifyError> {
        Err(VerifyError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn verifier_outage_is_an_error_not_a_rejection() {
    let mut h = Harness::new();
    let ctx = ServiceContext::with_store(
        ServiceConfig::default(),
        h.store.clone(),
        Arc::new(h.feeds.clone()),
        Arc::new(UnavailableVerifier),
        Arc::new(h.heights.clone()),
    );
    let alice = h.join("alice").await;
    let msg = h.post_message(&alice);
    let vote = h.vote(0);
    let req = h.request("alice", msg, &vote, alice).await;

    let err = ctx.reactions.submit_reaction(req).await.unwrap_err();
    assert!(matches!(err, ServiceError::Verifier(_)));
    assert!(!err.public_message().contains("refused"));
    assert!(!ctx
        .queries
        .nullifier_exists(&Harness::nullifier("alice", &msg))
        .await
        .unwrap());
}
