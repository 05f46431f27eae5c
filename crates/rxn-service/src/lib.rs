//! # rxn-service: Anonymous Reaction Services
//!
//! The top of the dependency DAG. Puts the primitives of `rxn-crypto`, the
//! verifier seam of `rxn-zkp` and the submission typestate of `rxn-state`
//! behind four services sharing one store:
//!
//! - [`MembershipService`]: register and revoke commitments, inclusion
//!   proofs, root history.
//! - [`MembershipCommandHandler`]: idempotent handling of upstream
//!   join / leave / ban / unban events.
//! - [`ReactionService`]: the submission pipeline (gates, nullifier
//!   classification, homomorphic tally fold, audit row).
//! - [`ReactionQueryService`]: nullifier, backup and tally reads.
//!
//! ## Storage
//!
//! Repositories are traits (`store`). [`MemoryStore`] backs tests and
//! local runs; [`PgStore`] backs deployments when `DATABASE_URL` is set.
//!
//! ## Crate Policy
//!
//! - No transport: hosts expose these services over whatever API they run.
//! - Rejections are values; only infrastructure faults are `Err`.
//! - Locks are never held across `.await`.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod membership;
pub mod providers;
pub mod queries;
pub mod reactions;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, ServiceConfig};
pub use db::PgStore;
pub use error::{ServiceError, StorageError};
pub use events::{EventId, EventOutcome, MembershipCommandHandler, MembershipEvent, MembershipEventKind};
pub use membership::{
    verify_membership_proof, MembershipProof, MembershipService, RegisterCommitmentResult,
};
pub use providers::{BlockHeightSource, FeedInfoProvider, InMemoryFeedInfo, ManualBlockHeight};
pub use queries::ReactionQueryService;
pub use reactions::{PipelineSettings, ReactionService};
pub use state::{ReactionStore, ServiceContext};
pub use store::{
    CommitmentRepository, EventApplied, MembershipChange, MemoryStore, ReactionRepository,
    RegisterOutcome, RootHistoryRepository,
};
