//! # Verifier Trait
//!
//! The proof of a reaction attests that the prover knows a secret whose
//! commitment is a leaf under `root`, that the nullifier is derived from
//! that secret and the message, and that the ciphertext is a well-formed
//! vote under the feed key. The circuit itself is opaque to the service:
//! it only sees this trait.
//!
//! ## Outcome vs Error
//!
//! A proof that does not verify is a *value*
//! (`VerificationOutcome { valid: false, .. }`), because the pipeline turns
//! it into an `INVALID_PROOF` rejection. `VerifyError` is reserved for the
//! verifier itself failing (backend unavailable, worker panicked).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inputs::PublicInputs;

/// Failure of the verifier backend, distinct from proof rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The backend could not be reached.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
    /// The backend failed while verifying.
    #[error("verifier backend error: {0}")]
    Backend(String),
    /// A verifying key could not be loaded.
    #[error("invalid verifying key for circuit {circuit}: {reason}")]
    InvalidKey {
        /// Circuit version the key was registered under.
        circuit: String,
        /// Decoder detail.
        reason: String,
    },
}

/// Error while producing a proof (test and tooling provers only).
#[derive(Error, Debug)]
pub enum ProofError {
    /// The public inputs could not be encoded.
    #[error("input error: {0}")]
    Inputs(String),
    /// Internal prover error.
    #[error("prover error: {0}")]
    Prover(String),
}

/// Result of checking one proof against one set of public inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the proof verified.
    pub valid: bool,
    /// Machine-readable rejection reason.
    pub error: Option<String>,
    /// Human-readable rejection detail.
    pub message: Option<String>,
}

impl VerificationOutcome {
    /// A verified proof.
    pub fn accepted() -> Self {
        Self {
            valid: true,
            error: None,
            message: None,
        }
    }

    /// A rejected proof with its reason.
    pub fn rejected(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }
}

/// An asynchronous, possibly slow proof verifier.
#[async_trait]
pub trait ZkVerifier: Send + Sync {
    /// Check `proof` against `inputs` for the named circuit.
    async fn verify(
        &self,
        proof: &[u8],
        inputs: &PublicInputs,
        circuit_version: &str,
    ) -> Result<VerificationOutcome, VerifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_carries_detail() {
        let o = VerificationOutcome::rejected("BAD_PROOF", "pairing check failed");
        assert!(!o.valid);
        assert_eq!(o.error.as_deref(), Some("BAD_PROOF"));
        assert_eq!(o.message.as_deref(), Some("pairing check failed"));
    }

    #[test]
    fn accepted_has_no_detail() {
        let o = VerificationOutcome::accepted();
        assert!(o.valid);
        assert!(o.error.is_none() && o.message.is_none());
    }
}
