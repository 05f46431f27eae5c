//! # Reaction Submission Typestate
//!
//! Encodes the submission pipeline as a sequence of types. Each gate is a
//! method that consumes the current stage and yields either the next
//! stage or a [`Rejection`]. A tally can only be folded by a
//! `Submission<ProofVerified>`, and one can only be produced by naming a
//! root from the window, so skipping proof verification is a compile error.
//!
//! ## Stages
//!
//! ```text
//! Unsubmitted ──validate_shape()──▶ ShapeValidated ──resolve_feed()──▶ FeedResolved
//!     ──resolve_message()──▶ ContextResolved ──with_root_window()──▶ RootWindowAvailable
//!     ──accept_proof()──▶ ProofVerified ──classify()──▶ NullifierClassified
//!     ──fold()──▶ TallyUpdated ──commit()──▶ Committed
//! ```
//!
//! Every gate up to and including `accept_proof` can reject. After the
//! proof is accepted, failures are infrastructure faults, not rejections.
//!
//! ## Gate Order
//!
//! Shape (lengths, then points) runs before any lookup, so a malformed
//! request is rejected even if its feed or message does not exist.
//!
//! ```compile_fail
//! use rxn_state::submission::*;
//! # fn f(s: Submission<ContextResolved>, t: Option<rxn_core::MessageReactionTally>) {
//! // ERROR: no method named `fold` found for `Submission<ContextResolved>`
//! let _ = s.fold(t, rxn_core::BlockHeight(1));
//! # }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rxn_core::{
    BlockHeight, Commitment, CurvePoint, MerkleRoot, MessageReactionTally, ReactionNullifier,
    ReactionTransaction, TransactionId, VoteCiphertext,
};
use rxn_crypto::elgamal::{add_votes, sub_votes, validate_vote};
use rxn_crypto::CryptoError;
use rxn_zkp::PublicInputs;

use crate::request::{ReactionErrorCode, Rejection, SubmitReactionRequest, SubmitReactionResult};

// ─── Stage Types ─────────────────────────────────────────────────────

/// Stage: request received, nothing checked.
#[derive(Debug, Clone)]
pub struct Unsubmitted;

/// Stage: ciphertext has the right width and every point is valid.
#[derive(Debug, Clone)]
pub struct ShapeValidated {
    vote: VoteCiphertext,
}

/// Stage: the feed's public key is known.
#[derive(Debug, Clone)]
pub struct FeedResolved {
    vote: VoteCiphertext,
    feed_key: CurvePoint,
}

/// Stage: feed key and message author commitment are known.
#[derive(Debug, Clone)]
pub struct ContextResolved {
    vote: VoteCiphertext,
    feed_key: CurvePoint,
    author: Commitment,
}

/// Stage: a non-empty recent-roots window is available.
#[derive(Debug, Clone)]
pub struct RootWindowAvailable {
    vote: VoteCiphertext,
    feed_key: CurvePoint,
    author: Commitment,
    roots: Vec<MerkleRoot>,
}

/// Stage: the proof verified against `matched_root`.
#[derive(Debug, Clone)]
pub struct ProofVerified {
    vote: VoteCiphertext,
    matched_root: MerkleRoot,
}

/// Whether the nullifier was seen before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// First reaction of this member to this message.
    New,
    /// Replacement of an earlier reaction.
    Update {
        /// The row being replaced.
        previous: Box<ReactionNullifier>,
    },
}

impl Classification {
    /// Whether this is a first reaction.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }
}

/// Stage: nullifier looked up and classified.
#[derive(Debug, Clone)]
pub struct NullifierClassified {
    vote: VoteCiphertext,
    matched_root: MerkleRoot,
    classification: Classification,
}

/// Stage: the write set for the atomic commit is computed.
#[derive(Debug, Clone)]
pub struct TallyUpdated {
    write: ReactionWrite,
}

/// Stage: the write set is durable (terminal).
#[derive(Debug, Clone)]
pub struct Committed {
    transaction_id: TransactionId,
}

// ─── Sealed Trait ────────────────────────────────────────────────────

mod private {
    pub trait Sealed {}
    impl Sealed for super::Unsubmitted {}
    impl Sealed for super::ShapeValidated {}
    impl Sealed for super::FeedResolved {}
    impl Sealed for super::ContextResolved {}
    impl Sealed for super::RootWindowAvailable {}
    impl Sealed for super::ProofVerified {}
    impl Sealed for super::NullifierClassified {}
    impl Sealed for super::TallyUpdated {}
    impl Sealed for super::Committed {}
}

/// Marker trait for pipeline stages.
///
/// Sealed: only the stages defined in this module implement it.
pub trait SubmissionState: private::Sealed + fmt::Debug {
    /// Canonical stage name (e.g., "PROOF_VERIFIED").
    fn name() -> &'static str;

    /// Whether no further transition exists.
    fn is_terminal() -> bool {
        false
    }
}

macro_rules! stage_name {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl SubmissionState for $ty {
            fn name() -> &'static str {
                $name
            }
        })*
    };
}

stage_name! {
    Unsubmitted => "UNSUBMITTED",
    ShapeValidated => "SHAPE_VALIDATED",
    FeedResolved => "FEED_RESOLVED",
    ContextResolved => "CONTEXT_RESOLVED",
    RootWindowAvailable => "ROOT_WINDOW_AVAILABLE",
    ProofVerified => "PROOF_VERIFIED",
    NullifierClassified => "NULLIFIER_CLASSIFIED",
    TallyUpdated => "TALLY_UPDATED",
}

impl SubmissionState for Committed {
    fn name() -> &'static str {
        "COMMITTED"
    }
    fn is_terminal() -> bool {
        true
    }
}

// ─── Write Set ───────────────────────────────────────────────────────

/// Everything one accepted reaction writes, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionWrite {
    /// Nullifier row to insert (new) or replace (update).
    pub nullifier: ReactionNullifier,
    /// Insert vs replace.
    pub is_new_nullifier: bool,
    /// The tally after folding.
    pub tally: MessageReactionTally,
    /// Version the tally was read at; `None` if it did not exist.
    pub expected_tally_version: Option<u64>,
    /// Audit row.
    pub transaction: ReactionTransaction,
}

// ─── Transition Record ───────────────────────────────────────────────

/// One stage change, for tracing a submission through the gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage left.
    pub from_state: String,
    /// Stage entered.
    pub to_state: String,
    /// When.
    pub timestamp: DateTime<Utc>,
}

// ─── The Submission ──────────────────────────────────────────────────

/// A reaction submission, parameterized by how far through the gates it is.
#[derive(Debug, Clone)]
pub struct Submission<S: SubmissionState> {
    request: SubmitReactionRequest,
    transition_log: Vec<StageRecord>,
    state: S,
}

impl<S: SubmissionState> Submission<S> {
    /// Canonical stage name.
    pub fn state_name(&self) -> &'static str {
        S::name()
    }

    /// Whether the submission reached its terminal stage.
    pub fn is_terminal(&self) -> bool {
        S::is_terminal()
    }

    /// The original request.
    pub fn request(&self) -> &SubmitReactionRequest {
        &self.request
    }

    /// All stage changes so far.
    pub fn transition_log(&self) -> &[StageRecord] {
        &self.transition_log
    }

    fn transition_to<T: SubmissionState>(mut self, state: T) -> Submission<T> {
        self.transition_log.push(StageRecord {
            from_state: S::name().to_string(),
            to_state: T::name().to_string(),
            timestamp: Utc::now(),
        });
        Submission {
            request: self.request,
            transition_log: self.transition_log,
            state,
        }
    }
}

impl Submission<Unsubmitted> {
    /// Start a submission.
    pub fn new(request: SubmitReactionRequest) -> Self {
        Self {
            request,
            transition_log: Vec::new(),
            state: Unsubmitted,
        }
    }

    /// Check column lengths against `slots`, then every point.
    pub fn validate_shape(self, slots: usize) -> Result<Submission<ShapeValidated>, Rejection> {
        let r = &self.request;
        let lengths = [
            r.ciphertext_c1x.len(),
            r.ciphertext_c1y.len(),
            r.ciphertext_c2x.len(),
            r.ciphertext_c2y.len(),
        ];
        if lengths.iter().any(|len| *len != slots) {
            return Err(Rejection::new(
                ReactionErrorCode::InvalidCiphertextSize,
                format!("expected {slots} entries per ciphertext array, got {lengths:?}"),
            ));
        }
        let vote = VoteCiphertext::from_components(
            &r.ciphertext_c1x,
            &r.ciphertext_c1y,
            &r.ciphertext_c2x,
            &r.ciphertext_c2y,
        )
        .map_err(|e| Rejection::new(ReactionErrorCode::InvalidCiphertextSize, e.to_string()))?;
        validate_vote(&vote).map_err(|e| {
            Rejection::new(ReactionErrorCode::InvalidCiphertextPoint, e.to_string())
        })?;
        Ok(self.transition_to(ShapeValidated { vote }))
    }
}

impl Submission<ShapeValidated> {
    /// Gate on the feed's public key.
    pub fn resolve_feed(
        self,
        feed_key: Option<CurvePoint>,
    ) -> Result<Submission<FeedResolved>, Rejection> {
        let Some(feed_key) = feed_key else {
            return Err(Rejection::new(
                ReactionErrorCode::FeedNotFound,
                format!("{} has no public key", self.request.feed_id),
            ));
        };
        let vote = self.state.vote.clone();
        Ok(self.transition_to(FeedResolved { vote, feed_key }))
    }
}

impl Submission<FeedResolved> {
    /// Gate on the message author's commitment.
    pub fn resolve_message(
        self,
        author: Option<Commitment>,
    ) -> Result<Submission<ContextResolved>, Rejection> {
        let Some(author) = author else {
            return Err(Rejection::new(
                ReactionErrorCode::MessageNotFound,
                format!("{} not found", self.request.message_id),
            ));
        };
        let FeedResolved { vote, feed_key } = self.state.clone();
        Ok(self.transition_to(ContextResolved {
            vote,
            feed_key,
            author,
        }))
    }
}

impl Submission<ContextResolved> {
    /// Gate on a non-empty window of recent roots (most recent first).
    pub fn with_root_window(
        self,
        roots: Vec<MerkleRoot>,
    ) -> Result<Submission<RootWindowAvailable>, Rejection> {
        if roots.is_empty() {
            return Err(Rejection::new(
                ReactionErrorCode::NoMerkleRoots,
                format!("{} has no membership roots", self.request.feed_id),
            ));
        }
        let ContextResolved {
            vote,
            feed_key,
            author,
        } = self.state.clone();
        Ok(self.transition_to(RootWindowAvailable {
            vote,
            feed_key,
            author,
            roots,
        }))
    }
}

impl Submission<RootWindowAvailable> {
    /// Candidate roots, most recent first.
    pub fn roots(&self) -> &[MerkleRoot] {
        &self.state.roots
    }

    /// The public inputs the proof must satisfy for `root`.
    pub fn public_inputs(&self, root: MerkleRoot) -> PublicInputs {
        PublicInputs::new(
            root,
            self.request.nullifier,
            &self.state.vote,
            self.state.feed_key,
            self.state.author,
        )
    }

    /// Record that the proof verified against `root`.
    pub fn accept_proof(self, root: MerkleRoot) -> Result<Submission<ProofVerified>, Rejection> {
        if !self.state.roots.contains(&root) {
            return Err(Rejection::new(
                ReactionErrorCode::InvalidProof,
                "proof root is outside the recent-roots window",
            ));
        }
        let vote = self.state.vote.clone();
        Ok(self.transition_to(ProofVerified {
            vote,
            matched_root: root,
        }))
    }

    /// No root in the window verified.
    pub fn reject_proof(self, detail: impl Into<String>) -> Rejection {
        Rejection::new(ReactionErrorCode::InvalidProof, detail)
    }
}

impl Submission<ProofVerified> {
    /// The root the proof matched.
    pub fn matched_root(&self) -> &MerkleRoot {
        &self.state.matched_root
    }

    /// Classify against the stored nullifier row, if any.
    ///
    /// A row bound to a different message is refused: replacing it would
    /// fold the old vote out of the wrong tally.
    pub fn classify(
        self,
        existing: Option<ReactionNullifier>,
    ) -> Result<Submission<NullifierClassified>, Rejection> {
        let classification = match existing {
            None => Classification::New,
            Some(row) if row.message_id == self.request.message_id => Classification::Update {
                previous: Box::new(row),
            },
            Some(_) => {
                return Err(Rejection::new(
                    ReactionErrorCode::InvalidProof,
                    "nullifier is bound to a different message",
                ))
            }
        };
        let ProofVerified { vote, matched_root } = self.state.clone();
        Ok(self.transition_to(NullifierClassified {
            vote,
            matched_root,
            classification,
        }))
    }
}

impl Submission<NullifierClassified> {
    /// New or update.
    pub fn classification(&self) -> &Classification {
        &self.state.classification
    }

    /// Fold the vote into `current` and assemble the write set.
    ///
    /// On update the previous vote is subtracted first, so the tally is
    /// always the sum of each member's latest vote.
    pub fn fold(
        self,
        current: Option<MessageReactionTally>,
        block_height: BlockHeight,
    ) -> Result<Submission<TallyUpdated>, CryptoError> {
        let now = Utc::now();
        let req = &self.request;
        let NullifierClassified {
            vote,
            classification,
            ..
        } = &self.state;

        let base = current
            .as_ref()
            .map(|t| t.tally.clone())
            .unwrap_or_else(|| VoteCiphertext::identity(vote.len()));
        let base = match classification {
            Classification::New => base,
            Classification::Update { previous } => sub_votes(&base, &previous.vote)?,
        };
        let tally = add_votes(&base, vote)?;

        let is_new = classification.is_new();
        let (total_count, version, expected_tally_version) = match &current {
            Some(t) => (t.total_count + u64::from(is_new), t.version + 1, Some(t.version)),
            None => (u64::from(is_new), 1, None),
        };
        let created_at = match classification {
            Classification::New => now,
            Classification::Update { previous } => previous.created_at,
        };

        let write = ReactionWrite {
            nullifier: ReactionNullifier {
                nullifier: req.nullifier,
                message_id: req.message_id,
                vote: vote.clone(),
                encrypted_backup: req.encrypted_backup.clone(),
                created_at,
                updated_at: now,
            },
            is_new_nullifier: is_new,
            tally: MessageReactionTally {
                message_id: req.message_id,
                feed_id: req.feed_id,
                tally,
                total_count,
                version,
                last_updated: now,
            },
            expected_tally_version,
            transaction: ReactionTransaction {
                id: TransactionId::new(),
                block_height,
                feed_id: req.feed_id,
                message_id: req.message_id,
                nullifier: req.nullifier,
                ciphertext: vote.clone(),
                proof_bytes: req.proof.clone(),
                circuit_version: req.circuit_version.clone(),
                created_at: now,
            },
        };
        Ok(self.transition_to(TallyUpdated { write }))
    }
}

impl Submission<TallyUpdated> {
    /// The write set to apply atomically.
    pub fn write(&self) -> &ReactionWrite {
        &self.state.write
    }

    /// Mark the write set durable.
    pub fn commit(self) -> Submission<Committed> {
        let transaction_id = self.state.write.transaction.id;
        self.transition_to(Committed { transaction_id })
    }
}

impl Submission<Committed> {
    /// Audit row identifier.
    pub fn transaction_id(&self) -> TransactionId {
        self.state.transaction_id
    }

    /// The caller-facing result.
    pub fn result(&self) -> SubmitReactionResult {
        SubmitReactionResult::accepted(self.state.transaction_id)
    }
}
