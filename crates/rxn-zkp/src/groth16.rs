//! # Groth16 Verifier
//!
//! Verifies reaction proofs produced by the off-device prover with Groth16
//! over BN254. Verifying keys are registered per circuit version; a
//! submission naming an unknown version is rejected, not errored.
//!
//! Proofs arrive in arkworks compressed serialization. Pairing checks run
//! on the blocking pool so a slow verification never stalls the executor.

use std::collections::HashMap;
use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use async_trait::async_trait;

use crate::inputs::PublicInputs;
use crate::traits::{VerificationOutcome, VerifyError, ZkVerifier};

/// Registry of prepared verifying keys by circuit version.
#[derive(Default, Clone)]
pub struct Groth16Verifier {
    keys: HashMap<String, Arc<PreparedVerifyingKey<Bn254>>>,
}

impl Groth16Verifier {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verifying key for `circuit_version`, replacing any prior key.
    pub fn register(&mut self, circuit_version: impl Into<String>, vk: &VerifyingKey<Bn254>) {
        self.keys
            .insert(circuit_version.into(), Arc::new(prepare_verifying_key(vk)));
    }

    /// Register a compressed-serialized verifying key.
    pub fn register_serialized(
        &mut self,
        circuit_version: impl Into<String>,
        vk_bytes: &[u8],
    ) -> Result<(), VerifyError> {
        let circuit = circuit_version.into();
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes).map_err(|e| {
            VerifyError::InvalidKey {
                circuit: circuit.clone(),
                reason: e.to_string(),
            }
        })?;
        self.register(circuit, &vk);
        Ok(())
    }

    /// Registered circuit versions, sorted.
    pub fn circuit_versions(&self) -> Vec<String> {
        let mut v: Vec<String> = self.keys.keys().cloned().collect();
        v.sort();
        v
    }
}

impl std::fmt::Debug for Groth16Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groth16Verifier")
            .field("circuits", &self.circuit_versions())
            .finish()
    }
}

#[async_trait]
impl ZkVerifier for Groth16Verifier {
    async fn verify(
        &self,
        proof: &[u8],
        inputs: &PublicInputs,
        circuit_version: &str,
    ) -> Result<VerificationOutcome, VerifyError> {
        let Some(pvk) = self.keys.get(circuit_version).cloned() else {
            tracing::warn!(circuit = circuit_version, "no verifying key registered");
            return Ok(VerificationOutcome::rejected(
                "UNKNOWN_CIRCUIT",
                format!("no verifying key for circuit {circuit_version}"),
            ));
        };
        let proof = match Proof::<Bn254>::deserialize_compressed(proof) {
            Ok(p) => p,
            Err(e) => {
                return Ok(VerificationOutcome::rejected(
                    "MALFORMED_PROOF",
                    e.to_string(),
                ))
            }
        };
        let fields = match inputs.to_field_elements() {
            Ok(f) => f,
            Err(e) => {
                return Ok(VerificationOutcome::rejected(
                    "MALFORMED_INPUTS",
                    e.to_string(),
                ))
            }
        };
        if pvk.vk.gamma_abc_g1.len() != fields.len() + 1 {
            return Ok(VerificationOutcome::rejected(
                "MALFORMED_INPUTS",
                format!(
                    "circuit {circuit_version} takes {} public inputs, got {}",
                    pvk.vk.gamma_abc_g1.len().saturating_sub(1),
                    fields.len()
                ),
            ));
        }

        let checked = tokio::task::spawn_blocking(move || {
            Groth16::<Bn254>::verify_proof(&pvk, &proof, &fields)
        })
        .await
        .map_err(|e| VerifyError::Backend(format!("verification task failed: {e}")))?;

        tracing::debug!(circuit = circuit_version, valid = ?checked, "groth16 pairing check");
        match checked {
            Ok(true) => Ok(VerificationOutcome::accepted()),
            Ok(false) => Ok(VerificationOutcome::rejected(
                "PROOF_REJECTED",
                "pairing check failed",
            )),
            Err(e) => Ok(VerificationOutcome::rejected(
                "MALFORMED_PROOF",
                e.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_relations::lc;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use ark_serialize::CanonicalSerialize;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use rxn_core::{Commitment, CurvePoint, FieldBytes, MerkleRoot, Nullifier, VoteCiphertext};
    use rxn_crypto::FieldEncoding;

    /// Binds every public input and proves knowledge of a factorization
    /// of the nullifier.
    #[derive(Clone)]
    struct BindingCircuit {
        inputs: Vec<Fr>,
        a: Fr,
        b: Fr,
    }

    impl ConstraintSynthesizer<Fr> for BindingCircuit {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
            let mut vars = Vec::with_capacity(self.inputs.len());
            for x in &self.inputs {
                let x = *x;
                vars.push(cs.new_input_variable(|| Ok(x))?);
            }
            let a = cs.new_witness_variable(|| Ok(self.a))?;
            let b = cs.new_witness_variable(|| Ok(self.b))?;
            cs.enforce_constraint(lc!() + a, lc!() + b, lc!() + vars[1])?;
            Ok(())
        }
    }

    fn fe(v: u64) -> FieldBytes {
        FieldBytes::from_field(&Fr::from(v))
    }

    fn statement(root: u64, nullifier: u64) -> PublicInputs {
        let vote = VoteCiphertext::from_components(&[fe(11)], &[fe(12)], &[fe(13)], &[fe(14)])
            .unwrap();
        PublicInputs::new(
            MerkleRoot::from_field(&Fr::from(root)),
            Nullifier::from_field(&Fr::from(nullifier)),
            &vote,
            CurvePoint::identity(),
            Commitment::from_field(&Fr::from(99u64)),
        )
    }

    fn setup() -> (Groth16Verifier, Vec<u8>, PublicInputs) {
        let mut rng = StdRng::seed_from_u64(42);
        let inputs = statement(1, 15);
        let fields = inputs.to_field_elements().unwrap();
        let blank = BindingCircuit {
            inputs: vec![Fr::from(0u64); fields.len()],
            a: Fr::from(0u64),
            b: Fr::from(0u64),
        };
        let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(blank, &mut rng)
            .unwrap();
        let circuit = BindingCircuit {
            inputs: fields,
            a: Fr::from(3u64),
            b: Fr::from(5u64),
        };
        let proof =
            Groth16::<Bn254>::create_random_proof_with_reduction(circuit, &pk, &mut rng).unwrap();
        let mut proof_bytes = Vec::new();
        proof.serialize_compressed(&mut proof_bytes).unwrap();

        let mut vk_bytes = Vec::new();
        pk.vk.serialize_compressed(&mut vk_bytes).unwrap();
        let mut verifier = Groth16Verifier::new();
        verifier.register_serialized("reaction-v1", &vk_bytes).unwrap();
        (verifier, proof_bytes, inputs)
    }

    #[tokio::test]
    async fn real_proof_verifies_and_binds_root() {
        let (verifier, proof, inputs) = setup();
        let ok = verifier.verify(&proof, &inputs, "reaction-v1").await.unwrap();
        assert!(ok.valid, "{ok:?}");

        let other_root = inputs.with_root(MerkleRoot::from_field(&Fr::from(2u64)));
        let bad = verifier.verify(&proof, &other_root, "reaction-v1").await.unwrap();
        assert!(!bad.valid);
        assert_eq!(bad.error.as_deref(), Some("PROOF_REJECTED"));
    }

    #[tokio::test]
    async fn unknown_circuit_is_rejection() {
        let (verifier, proof, inputs) = setup();
        let out = verifier.verify(&proof, &inputs, "reaction-v9").await.unwrap();
        assert_eq!(out.error.as_deref(), Some("UNKNOWN_CIRCUIT"));
    }

    #[tokio::test]
    async fn garbage_proof_is_rejection() {
        let (verifier, _, inputs) = setup();
        let out = verifier.verify(&[1, 2, 3], &inputs, "reaction-v1").await.unwrap();
        assert_eq!(out.error.as_deref(), Some("MALFORMED_PROOF"));
    }

    #[tokio::test]
    async fn input_count_mismatch_is_rejection() {
        let (verifier, proof, _) = setup();
        let wide = PublicInputs::new(
            MerkleRoot::from_field(&Fr::from(1u64)),
            Nullifier::from_field(&Fr::from(15u64)),
            &VoteCiphertext::identity(2),
            CurvePoint::identity(),
            Commitment::from_field(&Fr::from(99u64)),
        );
        let out = verifier.verify(&proof, &wide, "reaction-v1").await.unwrap();
        assert_eq!(out.error.as_deref(), Some("MALFORMED_INPUTS"));
    }

    #[test]
    fn bad_key_bytes_error() {
        let mut verifier = Groth16Verifier::new();
        let err = verifier.register_serialized("v1", &[0u8; 4]).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidKey { .. }));
        assert!(verifier.circuit_versions().is_empty());
    }
}
