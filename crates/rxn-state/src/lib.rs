//! # rxn-state: Typestate-Encoded Submission Pipeline
//!
//! Implements the reaction submission pipeline using the typestate
//! pattern. Each stage is a distinct Rust type, and each gate is a method
//! that consumes the current stage and produces the next one or a
//! rejection. Skipping a gate is a compile error, not a runtime check.
//!
//! - **Request** (`request.rs`): `SubmitReactionRequest`,
//!   `SubmitReactionResult`, and the closed `ReactionErrorCode` set.
//!
//! - **Submission** (`submission.rs`): `Submission<S>` from `Unsubmitted`
//!   through `Committed`, producing the atomic `ReactionWrite`.
//!
//! The crate does no I/O. Lookups, verification and persistence are the
//! caller's; this crate decides what each answer means.

pub mod request;
pub mod submission;

pub use request::{ReactionErrorCode, Rejection, SubmitReactionRequest, SubmitReactionResult};
pub use submission::{
    Classification, Committed, ContextResolved, FeedResolved, NullifierClassified, ProofVerified,
    ReactionWrite, RootWindowAvailable, ShapeValidated, StageRecord, Submission, SubmissionState,
    TallyUpdated, Unsubmitted,
};
