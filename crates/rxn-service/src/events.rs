//! # Membership Events
//!
//! Upstream membership changes arrive as events, at least once and possibly
//! replayed. [`MembershipCommandHandler`] turns each into membership
//! commands:
//!
//! | Kind  | Commands                                        |
//! |-------|-------------------------------------------------|
//! | Join  | derive commitment, register                     |
//! | Unban | derive commitment, register                     |
//! | Leave | derive commitment, revoke, record root          |
//! | Ban   | derive commitment, revoke, record root          |
//!
//! The store records each event id in the same step as the change it
//! makes, so a stale replay (an old Join redelivered after a Leave) is a
//! no-op across restarts and across handlers sharing one store. An event
//! that fails stored nothing and can be redelivered.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rxn_core::{FeedId, MemberAddress, MerkleRoot};
use rxn_crypto::derive_commitment;

use crate::error::ServiceError;
use crate::membership::MembershipService;
use crate::store::{EventApplied, MembershipChange, RegisterOutcome};
use crate::telemetry;

/// Upstream event identifier, unique per delivery source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event:{}", self.0)
    }
}

/// What happened to the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipEventKind {
    Join,
    Leave,
    Ban,
    Unban,
}

impl MembershipEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Ban => "ban",
            Self::Unban => "unban",
        }
    }

    /// Whether the member ends up in the tree.
    pub fn grants_membership(&self) -> bool {
        matches!(self, Self::Join | Self::Unban)
    }
}

/// One upstream membership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub event_id: EventId,
    pub feed_id: FeedId,
    pub address: MemberAddress,
    pub kind: MembershipEventKind,
    /// Feed key generation in force when the event happened.
    #[serde(default)]
    pub key_generation: u32,
}

/// Effect of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Member added (or re-added); a root was appended.
    Registered { root: MerkleRoot },
    /// Member was already active.
    AlreadyRegistered,
    /// Member removed; a root was appended.
    Revoked { root: MerkleRoot },
    /// Member was not active; nothing changed.
    NotMember,
    /// The event id was already handled.
    Duplicate,
}

impl EventOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::AlreadyRegistered => "already_registered",
            Self::Revoked { .. } => "revoked",
            Self::NotMember => "not_member",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Applies membership events through a [`MembershipService`].
#[derive(Debug, Clone)]
pub struct MembershipCommandHandler {
    membership: MembershipService,
}

impl MembershipCommandHandler {
    pub fn new(membership: MembershipService) -> Self {
        Self { membership }
    }

    /// Whether `event_id` completed before.
    pub async fn is_processed(&self, event_id: &EventId) -> Result<bool, ServiceError> {
        self.membership.is_event_processed(event_id).await
    }

    /// Handle one event.
    #[tracing::instrument(
        skip_all,
        fields(event = %event.event_id, feed = %event.feed_id, kind = event.kind.as_str())
    )]
    pub async fn handle(&self, event: &MembershipEvent) -> Result<EventOutcome, ServiceError> {
        let commitment = derive_commitment(&event.address);
        let change = if event.kind.grants_membership() {
            MembershipChange::Activate {
                key_generation: event.key_generation,
            }
        } else {
            MembershipChange::Revoke
        };

        let applied = self
            .membership
            .apply_event(&event.event_id, &event.feed_id, &commitment, change)
            .await?;
        let outcome = match applied {
            EventApplied::Duplicate => EventOutcome::Duplicate,
            EventApplied::Registered(RegisterOutcome::Registered { root, .. }) => {
                EventOutcome::Registered { root }
            }
            EventApplied::Registered(RegisterOutcome::AlreadyActive { .. }) => {
                EventOutcome::AlreadyRegistered
            }
            EventApplied::Revoked { root } => EventOutcome::Revoked { root },
            EventApplied::NotActive => EventOutcome::NotMember,
        };

        telemetry::membership_event(event.kind.as_str(), outcome.label());
        if outcome == EventOutcome::Duplicate {
            tracing::debug!("event already handled");
        } else {
            tracing::info!(outcome = outcome.label(), "membership event applied");
        }
        Ok(outcome)
    }
}
