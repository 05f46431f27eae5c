//! # Public Inputs
//!
//! The statement a reaction proof is checked against. Flattened into field
//! elements in a fixed order that the circuit's input layout mirrors:
//!
//! ```text
//! root, nullifier, c1x[0..n], c1y[0..n], c2x[0..n], c2y[0..n],
//! feed_pk.x, feed_pk.y, author_commitment
//! ```

use serde::{Deserialize, Serialize};

use rxn_core::{Commitment, CurvePoint, FieldBytes, MerkleRoot, Nullifier, VoteCiphertext};
use rxn_crypto::{CryptoError, FieldEncoding, Fq};

/// Public inputs of the reaction circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    /// Tree root the membership part is proven against.
    pub root: MerkleRoot,
    /// Replay tag of the reaction.
    pub nullifier: Nullifier,
    /// Ephemeral x coordinates.
    pub c1x: Vec<FieldBytes>,
    /// Ephemeral y coordinates.
    pub c1y: Vec<FieldBytes>,
    /// Payload x coordinates.
    pub c2x: Vec<FieldBytes>,
    /// Payload y coordinates.
    pub c2y: Vec<FieldBytes>,
    /// The feed's ElGamal public key.
    pub feed_public_key: CurvePoint,
    /// Commitment of the reacted-to message's author.
    pub author_commitment: Commitment,
}

impl PublicInputs {
    /// Bundle the statement for one candidate root.
    pub fn new(
        root: MerkleRoot,
        nullifier: Nullifier,
        vote: &VoteCiphertext,
        feed_public_key: CurvePoint,
        author_commitment: Commitment,
    ) -> Self {
        let [c1x, c1y, c2x, c2y] = vote.components();
        Self {
            root,
            nullifier,
            c1x,
            c1y,
            c2x,
            c2y,
            feed_public_key,
            author_commitment,
        }
    }

    /// Same statement against a different root.
    pub fn with_root(&self, root: MerkleRoot) -> Self {
        Self {
            root,
            ..self.clone()
        }
    }

    /// Number of reaction slots.
    pub fn slots(&self) -> usize {
        self.c1x.len()
    }

    /// Number of field elements after flattening.
    pub fn field_count(&self) -> usize {
        5 + self.c1x.len() + self.c1y.len() + self.c2x.len() + self.c2y.len()
    }

    /// Flatten to field elements, rejecting non-canonical encodings.
    pub fn to_field_elements(&self) -> Result<Vec<Fq>, CryptoError> {
        let mut out = Vec::with_capacity(self.field_count());
        out.push(self.root.to_field()?);
        out.push(self.nullifier.to_field()?);
        for column in [&self.c1x, &self.c1y, &self.c2x, &self.c2y] {
            for v in column.iter() {
                out.push(v.to_field()?);
            }
        }
        out.push(self.feed_public_key.x.to_field()?);
        out.push(self.feed_public_key.y.to_field()?);
        out.push(self.author_commitment.to_field()?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: u64) -> FieldBytes {
        FieldBytes::from_field(&Fq::from(v))
    }

    fn sample() -> PublicInputs {
        let vote = VoteCiphertext::from_components(
            &[fe(10), fe(11)],
            &[fe(20), fe(21)],
            &[fe(30), fe(31)],
            &[fe(40), fe(41)],
        )
        .unwrap();
        PublicInputs::new(
            MerkleRoot::from_field(&Fq::from(1u64)),
            Nullifier::from_field(&Fq::from(2u64)),
            &vote,
            CurvePoint { x: fe(50), y: fe(51) },
            Commitment::from_field(&Fq::from(60u64)),
        )
    }

    #[test]
    fn flattening_order() {
        let fields = sample().to_field_elements().unwrap();
        let expected: Vec<Fq> = [1u64, 2, 10, 11, 20, 21, 30, 31, 40, 41, 50, 51, 60]
            .into_iter()
            .map(Fq::from)
            .collect();
        assert_eq!(fields, expected);
        assert_eq!(sample().field_count(), expected.len());
    }

    #[test]
    fn with_root_changes_only_root() {
        let a = sample();
        let b = a.with_root(MerkleRoot::from_field(&Fq::from(9u64)));
        assert_ne!(a.root, b.root);
        assert_eq!(a.nullifier, b.nullifier);
        assert_eq!(a.c2y, b.c2y);
    }

    #[test]
    fn non_canonical_input_rejected() {
        let mut inputs = sample();
        inputs.nullifier = Nullifier::from_bytes([0xff; 32]);
        assert!(inputs.to_field_elements().is_err());
    }
}
