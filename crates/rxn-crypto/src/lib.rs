//! # rxn-crypto: Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for anonymous reactions:
//!
//! - **Field encoding** of the BN254 scalar field with strict canonical
//!   decoding of 32-byte values.
//! - **Baby Jubjub** point validation, addition, negation and scalar
//!   multiplication.
//! - **Poseidon** hashing with per-use domain tags.
//! - **Additive ElGamal** for homomorphic reaction tallies.
//! - **Derivation** of commitments, nullifiers and HKDF symmetric keys.
//! - **Membership tree** of fixed depth with zero-hash padding.
//! - **Secret providers** for the local member identity.
//!
//! ## Crate Policy
//!
//! - Depends only on `rxn-core` internally.
//! - No mocking of cryptographic operations in tests: all tests use real
//!   curve arithmetic and real Poseidon.
//! - `unsafe` prohibited.

pub mod curve;
pub mod derive;
pub mod elgamal;
pub mod error;
pub mod field;
pub mod key_provider;
pub mod poseidon;
pub mod tree;

pub use curve::{Point, Scalar};
pub use derive::{
    derive_commitment, derive_feed_secret, derive_nullifier, derive_reaction_key, DerivedKey,
};
pub use elgamal::{encrypt, encrypt_vote, ElGamalKeypair};
pub use error::CryptoError;
pub use field::{FieldEncoding, Fq};
pub use key_provider::{EnvSecretProvider, LocalIdentity, LocalSecretProvider, SecretProvider};
pub use tree::{verify_membership_proof, MembershipPath, MembershipTree};
