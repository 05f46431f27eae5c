//! # Reaction Submission
//!
//! Drives a [`SubmitReactionRequest`] through the gates of
//! [`rxn_state::submission`] against the live collaborators:
//!
//! 1. shape (lengths, then points), with no I/O
//! 2. feed public key
//! 3. message author commitment
//! 4. recent-roots window
//! 5. proof, tried against each window root, most recent first
//! 6. nullifier classification, tally fold and atomic commit
//!
//! Gates 1 to 5 and a nullifier bound to another message end in a
//! rejection value. Step 6 re-reads nullifier and tally and retries when
//! the store reports a version conflict; once retries run out the caller
//! gets [`ServiceError::ConcurrencyExhausted`].
//!
//! Nothing about a rejected proof is remembered: resubmitting with a
//! corrected proof goes through every gate again.

use std::sync::Arc;
use std::time::Instant;

use rxn_core::MerkleRoot;
use rxn_state::{
    Committed, Rejection, RootWindowAvailable, Submission, SubmitReactionRequest,
    SubmitReactionResult,
};
use rxn_zkp::{VerificationOutcome, ZkVerifier};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::providers::{BlockHeightSource, FeedInfoProvider};
use crate::store::{ReactionRepository, RootHistoryRepository};
use crate::telemetry;

/// Pipeline tuning taken from [`ServiceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub root_window: usize,
    pub reaction_slots: usize,
    pub tally_max_retries: u32,
}

impl From<&ServiceConfig> for PipelineSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            root_window: config.root_window,
            reaction_slots: config.reaction_slots,
            tally_max_retries: config.tally_max_retries,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// Unwrap a gate, turning its rejection into an early `Ok(Err(..))`.
macro_rules! gate {
    ($stage:expr) => {
        match $stage {
            Ok(next) => next,
            Err(rejection) => return Ok(Err(rejection)),
        }
    };
}

/// The reaction submission pipeline.
#[derive(Clone)]
pub struct ReactionService {
    feeds: Arc<dyn FeedInfoProvider>,
    roots: Arc<dyn RootHistoryRepository>,
    reactions: Arc<dyn ReactionRepository>,
    verifier: Arc<dyn ZkVerifier>,
    heights: Arc<dyn BlockHeightSource>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for ReactionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ReactionService {
    pub fn new(
        feeds: Arc<dyn FeedInfoProvider>,
        roots: Arc<dyn RootHistoryRepository>,
        reactions: Arc<dyn ReactionRepository>,
        verifier: Arc<dyn ZkVerifier>,
        heights: Arc<dyn BlockHeightSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            feeds,
            roots,
            reactions,
            verifier,
            heights,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Submit one reaction.
    ///
    /// Rejections are `Ok` results with `success == false`; only
    /// infrastructure faults are `Err`.
    #[tracing::instrument(
        skip_all,
        fields(feed = %request.feed_id, message = %request.message_id)
    )]
    pub async fn submit_reaction(
        &self,
        request: SubmitReactionRequest,
    ) -> Result<SubmitReactionResult, ServiceError> {
        match self.run(request).await {
            Ok(Ok(committed)) => {
                telemetry::submission("accepted");
                tracing::info!(
                    tx = %committed.transaction_id(),
                    stages = committed.transition_log().len(),
                    "reaction committed"
                );
                Ok(committed.result())
            }
            Ok(Err(rejection)) => {
                telemetry::submission(rejection.code.as_str());
                tracing::warn!(code = %rejection.code, detail = %rejection.message, "reaction rejected");
                Ok(rejection.into())
            }
            Err(e) => {
                telemetry::submission("error");
                tracing::error!(error = %e, "reaction submission failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: SubmitReactionRequest,
    ) -> Result<Result<Submission<Committed>, Rejection>, ServiceError> {
        let feed_id = request.feed_id;
        let message_id = request.message_id;
        let nullifier = request.nullifier;

        let shaped = gate!(Submission::new(request).validate_shape(self.settings.reaction_slots));

        let feed_key = self.feeds.feed_public_key(&feed_id).await?;
        let with_feed = gate!(shaped.resolve_feed(feed_key));

        let author = self.feeds.author_commitment(&feed_id, &message_id).await?;
        let resolved = gate!(with_feed.resolve_message(author));

        let roots = self
            .roots
            .recent_roots(&feed_id, self.settings.root_window)
            .await?;
        let windowed = gate!(resolved.with_root_window(roots));

        let verified = match self.find_matching_root(&windowed).await? {
            Ok(root) => gate!(windowed.accept_proof(root)),
            Err(outcome) => {
                let detail = match (outcome.error, outcome.message) {
                    (Some(code), Some(msg)) => format!("{code}: {msg}"),
                    (Some(code), None) => code,
                    (None, Some(msg)) => msg,
                    (None, None) => "proof did not verify against any recent root".to_string(),
                };
                return Ok(Err(windowed.reject_proof(detail)));
            }
        };
        tracing::debug!(root = %verified.matched_root(), "proof verified");

        let height = self.heights.current_height().await?;
        let attempts = self.settings.tally_max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let existing = self.reactions.get_nullifier(&nullifier).await?;
            let classified = gate!(verified.clone().classify(existing));
            let is_new = classified.classification().is_new();
            let current = self.reactions.get_tally(&message_id).await?;
            let folded = classified.fold(current, height)?;

            match self.reactions.commit_reaction(folded.write()).await {
                Ok(()) => {
                    tracing::debug!(attempt, is_new, "write set committed");
                    return Ok(Ok(folded.commit()));
                }
                Err(e) if e.is_conflict() => {
                    telemetry::tally_conflict();
                    tracing::warn!(attempt, error = %e, "tally conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::ConcurrencyExhausted { attempts })
    }

    /// First window root the proof verifies against, or the outcome for
    /// the most recent root when none does.
    async fn find_matching_root(
        &self,
        windowed: &Submission<RootWindowAvailable>,
    ) -> Result<Result<MerkleRoot, VerificationOutcome>, ServiceError> {
        let request = windowed.request();
        let mut first_failure = None;
        for root in windowed.roots() {
            let inputs = windowed.public_inputs(*root);
            let started = Instant::now();
            let outcome = self
                .verifier
                .verify(&request.proof, &inputs, &request.circuit_version)
                .await?;
            telemetry::proof_verification(started.elapsed(), outcome.valid);
            if outcome.valid {
                return Ok(Ok(*root));
            }
            first_failure.get_or_insert(outcome);
        }
        Ok(Err(first_failure.unwrap_or_else(|| {
            VerificationOutcome::rejected("NO_ROOTS", "no candidate roots")
        })))
    }
}
