//! # rxn-zkp: Reaction Proof Verification
//!
//! The service treats the reaction circuit as an opaque oracle. This crate
//! defines that oracle's interface and ships two implementations.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ZkVerifier`, the async verification seam,
//!   and `VerificationOutcome`, which separates a rejected proof (a value)
//!   from a failed verifier (an error).
//!
//! - **Inputs** (`inputs.rs`): `PublicInputs` and its fixed flattening
//!   order into field elements.
//!
//! - **Groth16** (`groth16.rs`): verifying keys per circuit version over
//!   BN254, with pairing checks on the blocking pool.
//!
//! - **Mock** (`mock.rs`): a transparent hash-based verifier that binds
//!   every public input. Tests only.
//!
//! ## Crate Policy
//!
//! - Depends on `rxn-core` and `rxn-crypto` internally.
//! - The mock verifier is behind the default `mock` feature.

pub mod groth16;
pub mod inputs;
#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

/// Circuit version submitted by current clients.
pub const DEFAULT_CIRCUIT_VERSION: &str = "reaction-v1";

pub use groth16::Groth16Verifier;
pub use inputs::PublicInputs;
#[cfg(feature = "mock")]
pub use mock::{mock_prove, MockVerifier};
pub use traits::{ProofError, VerificationOutcome, VerifyError, ZkVerifier};
