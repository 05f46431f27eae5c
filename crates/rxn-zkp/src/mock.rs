//! # Transparent Verifier
//!
//! A deterministic, transparent "proof system": a proof is the SHA-256 of
//! the circuit version and the flattened public inputs. It provides no
//! zero-knowledge and no soundness against anyone who can hash, but it
//! binds every public input exactly like a real proof would, which is what
//! pipeline tests need (a proof made for root R verifies only against R).
//!
//! ## Security Notice
//!
//! Never wire this into a deployment. It exists behind the default `mock`
//! feature for tests and local development.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use rxn_crypto::field::fq_to_bytes;

use crate::inputs::PublicInputs;
use crate::traits::{ProofError, VerificationOutcome, VerifyError, ZkVerifier};

const MOCK_PROOF_DOMAIN: &[u8] = b"rxn/mock-proof/v1";

fn transcript(inputs: &PublicInputs, circuit_version: &str) -> Result<[u8; 32], ProofError> {
    let fields = inputs
        .to_field_elements()
        .map_err(|e| ProofError::Inputs(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(MOCK_PROOF_DOMAIN);
    hasher.update((circuit_version.len() as u64).to_be_bytes());
    hasher.update(circuit_version.as_bytes());
    for f in &fields {
        hasher.update(fq_to_bytes(f));
    }
    Ok(hasher.finalize().into())
}

/// Produce a transparent proof for `inputs`.
pub fn mock_prove(inputs: &PublicInputs, circuit_version: &str) -> Result<Vec<u8>, ProofError> {
    transcript(inputs, circuit_version).map(|d| d.to_vec())
}

/// Verifier accepting exactly the proofs [`mock_prove`] produces.
#[derive(Debug, Default, Clone)]
pub struct MockVerifier;

#[async_trait]
impl ZkVerifier for MockVerifier {
    async fn verify(
        &self,
        proof: &[u8],
        inputs: &PublicInputs,
        circuit_version: &str,
    ) -> Result<VerificationOutcome, VerifyError> {
        let expected = match transcript(inputs, circuit_version) {
            Ok(d) => d,
            Err(e) => return Ok(VerificationOutcome::rejected("MALFORMED_INPUTS", e.to_string())),
        };
        if proof == expected.as_slice() {
            Ok(VerificationOutcome::accepted())
        } else {
            Ok(VerificationOutcome::rejected(
                "PROOF_MISMATCH",
                "proof does not match the public inputs",
            ))
        }
    }
}
