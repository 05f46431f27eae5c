mod common;

use common::Harness;
use rxn_core::{BlockHeight, FeedId, MemberAddress};
use rxn_crypto::derive_commitment;
use rxn_service::{
    verify_membership_proof, EventId, EventOutcome, MembershipEvent, MembershipEventKind,
    RootHistoryRepository,
};
use uuid::Uuid;

#[tokio::test]
async fn update_root_is_a_function_of_the_leaf_set() {
    let h = Harness::new();
    for name in ["a1", "a2", "a3"] {
        h.join(name).await;
    }
    let at_10 = h.ctx.membership.update_root(&h.feed, BlockHeight(10)).await.unwrap();
    let at_99 = h.ctx.membership.update_root(&h.feed, BlockHeight(99)).await.unwrap();
    assert_eq!(at_10, at_99);
    assert_eq!(at_10, h.latest_root().await);
}

#[tokio::test]
async fn registration_order_does_not_change_the_root() {
    let h = Harness::new();
    let other = FeedId::new();
    let names = ["m1", "m2", "m3", "m4"];
    for name in names {
        h.join(name).await;
    }
    for name in names.iter().rev() {
        let c = derive_commitment(&Harness::address(name));
        h.ctx.membership.register_commitment(&other, &c).await.unwrap();
    }
    let theirs = h.ctx.membership.get_recent_roots(&other, 1).await.unwrap();
    assert_eq!(theirs, vec![h.latest_root().await]);
}

#[tokio::test]
async fn commitments_are_deterministic_and_distinct() {
    let a = MemberAddress::new("ABCDEF").unwrap();
    let b = MemberAddress::new("abcdef").unwrap();
    let c = MemberAddress::new("abcdee").unwrap();
    assert_eq!(derive_commitment(&a), derive_commitment(&b));
    assert_ne!(derive_commitment(&a), derive_commitment(&c));
}

#[tokio::test]
async fn every_active_member_has_a_valid_proof() {
    let h = Harness::new();
    let mut members = Vec::new();
    for i in 0..7 {
        members.push(h.join(&format!("member{i}")).await);
    }
    let root = h.latest_root().await;
    for c in &members {
        let proof = h.ctx.membership.get_membership_proof(&h.feed, c).await.unwrap();
        assert!(proof.is_member);
        assert_eq!(proof.root, Some(root));
        assert_eq!(proof.path_indices.as_ref().map(Vec::len), Some(20));
        assert!(verify_membership_proof(c, &proof));
    }
    let outsider = derive_commitment(&Harness::address("outsider"));
    let proof = h.ctx.membership.get_membership_proof(&h.feed, &outsider).await.unwrap();
    assert!(!proof.is_member);
    assert!(!verify_membership_proof(&outsider, &proof));
}

#[tokio::test]
async fn revoking_one_of_five_changes_the_root() {
    let h = Harness::new();
    let mut cs = Vec::new();
    for i in 1..=5 {
        cs.push(h.join(&format!("c{i}")).await);
    }
    let r5 = h.latest_root().await;

    assert!(h.ctx.membership.revoke_commitment(&h.feed, &cs[2]).await.unwrap());
    let height = h.heights.advance();
    let r4 = h.ctx.membership.update_root(&h.feed, height).await.unwrap();
    assert_ne!(r4, r5);

    let proof = h.ctx.membership.get_membership_proof(&h.feed, &cs[2]).await.unwrap();
    assert!(!proof.is_member);
    assert!(!h.ctx.membership.is_registered(&h.feed, &cs[2]).await.unwrap());

    // Same four members from scratch give the same root.
    let fresh = FeedId::new();
    for (i, c) in cs.iter().enumerate() {
        if i != 2 {
            h.ctx.membership.register_commitment(&fresh, c).await.unwrap();
        }
    }
    assert_eq!(h.ctx.membership.get_recent_roots(&fresh, 1).await.unwrap(), vec![r4]);

    // History keeps R5.
    let history = h.ctx.membership.get_recent_roots(&h.feed, 10).await.unwrap();
    assert_eq!(history[0], r4);
    assert!(history.contains(&r5));
}

#[tokio::test]
async fn recent_roots_returns_newest_first() {
    let h = Harness::new();
    for i in 1..=5 {
        h.join(&format!("r{i}")).await;
    }
    let all = h.store.recent_history(&h.feed, 100).await.unwrap();
    assert_eq!(all.len(), 5);

    let three = h.ctx.membership.get_recent_roots(&h.feed, 3).await.unwrap();
    assert_eq!(three.len(), 3);
    let expected: Vec<_> = all.iter().take(3).map(|r| r.root).collect();
    assert_eq!(three, expected);
    assert!(all[0].block_height > all[1].block_height);

    let more = h.ctx.membership.get_recent_roots(&h.feed, 50).await.unwrap();
    assert_eq!(more.len(), 5);
    assert!(h
        .ctx
        .membership
        .get_recent_roots(&FeedId::new(), 3)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn event_stream_drives_membership() {
    let h = Harness::new();
    let ev = |name: &str, kind| MembershipEvent {
        event_id: EventId(Uuid::new_v4()),
        feed_id: h.feed,
        address: Harness::address(name),
        kind,
        key_generation: 0,
    };

    let join_a = ev("alice", MembershipEventKind::Join);
    let join_b = ev("bob", MembershipEventKind::Join);
    assert!(matches!(h.ctx.events.handle(&join_a).await.unwrap(), EventOutcome::Registered { .. }));
    assert!(matches!(h.ctx.events.handle(&join_b).await.unwrap(), EventOutcome::Registered { .. }));
    assert_eq!(h.ctx.events.handle(&join_a).await.unwrap(), EventOutcome::Duplicate);

    let ban_b = ev("bob", MembershipEventKind::Ban);
    let EventOutcome::Revoked { root } = h.ctx.events.handle(&ban_b).await.unwrap() else {
        panic!("ban should revoke");
    };
    assert_eq!(h.latest_root().await, root);

    let bob = derive_commitment(&Harness::address("bob"));
    assert!(!h.ctx.membership.is_registered(&h.feed, &bob).await.unwrap());
    let roots_before = h.store.root_history_len(&h.feed);
    assert_eq!(h.ctx.events.handle(&ban_b).await.unwrap(), EventOutcome::Duplicate);
    assert_eq!(h.store.root_history_len(&h.feed), roots_before);
}
