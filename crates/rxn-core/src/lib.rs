//! # rxn-core: Foundational Types for Anonymous Reactions
//!
//! The leaf of the workspace dependency graph. Every other `rxn-*` crate
//! builds on the types defined here; this crate depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `FeedId`, `MessageId`,
//!    `TransactionId`, `MemberAddress`, `BlockHeight`. A `FeedId` can never
//!    be passed where a `MessageId` is expected.
//!
//! 2. **Fixed-width value types.** `Commitment`, `Nullifier`, `MerkleRoot`
//!    and `FieldBytes` are 32-byte big-endian encodings of field elements.
//!    Their serde form is lowercase hex.
//!
//! 3. **Curve points as bytes.** `CurvePoint` and `VoteCiphertext` carry
//!    encoded coordinates only. Decoding and arithmetic live in
//!    `rxn-crypto`, which keeps this crate free of any curve library.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rxn-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bytes;
pub mod error;
pub mod identity;
pub mod records;

pub use bytes::{Commitment, FieldBytes, MerkleRoot, Nullifier};
pub use error::CoreError;
pub use identity::{BlockHeight, FeedId, MemberAddress, MessageId, TransactionId};
pub use records::{
    CurvePoint, ElGamalCiphertext, FeedMemberCommitment, GroupMemberCommitment,
    MerkleRootHistory, MessageReactionTally, ReactionNullifier, ReactionTransaction,
    VoteCiphertext, TREE_DEPTH,
};
