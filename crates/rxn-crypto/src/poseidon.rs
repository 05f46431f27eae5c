//! # Poseidon Hash
//!
//! Arithmetic-circuit-native hash over the BN254 scalar field. The
//! membership circuit recomputes commitments, nullifiers and tree nodes
//! with the same permutation, so the native and in-circuit parameters must
//! agree exactly.
//!
//! ## Parameters
//!
//! Width 4 (rate 3, capacity 1), 8 full rounds, 56 partial rounds,
//! S-box `x^5`. Round constants and the MDS matrix come from
//! `find_poseidon_ark_and_mds` seeded with the field size, so any
//! implementation using the same generator reproduces them.
//!
//! ## Domain Separation
//!
//! Every use prepends a distinct tag element, so a commitment can never
//! collide with a nullifier or a tree node built from the same inputs.

use std::sync::OnceLock;

use ark_ff::PrimeField;
use ark_sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge};
use ark_sponge::CryptographicSponge;

use crate::field::Fq;

const POSEIDON_RATE: usize = 3;
const FULL_ROUNDS: u64 = 8;
const PARTIAL_ROUNDS: u64 = 56;
const ALPHA: u64 = 5;

/// Tag for `commitment = H(TAG_COMMITMENT, secret)`.
pub const TAG_COMMITMENT: u64 = 1;
/// Tag for `node = H(TAG_NODE, left, right)`.
pub const TAG_NODE: u64 = 2;
/// Tag for `nullifier = H(TAG_NULLIFIER, secret, message)`.
pub const TAG_NULLIFIER: u64 = 3;

static PARAMS: OnceLock<PoseidonConfig<Fq>> = OnceLock::new();

/// The shared parameter set, generated once per process.
pub fn poseidon_params() -> &'static PoseidonConfig<Fq> {
    PARAMS.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fq>(
            Fq::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            FULL_ROUNDS,
            PARTIAL_ROUNDS,
            0,
        );
        PoseidonConfig::new(
            FULL_ROUNDS as usize,
            PARTIAL_ROUNDS as usize,
            ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            1,
        )
    })
}

/// Hash a sequence of field elements to one field element.
pub fn hash(inputs: &[Fq]) -> Fq {
    let mut sponge = PoseidonSponge::<Fq>::new(poseidon_params());
    sponge.absorb(&inputs);
    sponge.squeeze_field_elements(1)[0]
}

/// `H(TAG_COMMITMENT, secret)`.
pub fn hash_commitment(secret: Fq) -> Fq {
    hash(&[Fq::from(TAG_COMMITMENT), secret])
}

/// `H(TAG_NODE, left, right)`.
pub fn hash_node(left: Fq, right: Fq) -> Fq {
    hash(&[Fq::from(TAG_NODE), left, right])
}

/// `H(TAG_NULLIFIER, secret, message)`.
pub fn hash_nullifier(secret: Fq, message: Fq) -> Fq {
    hash(&[Fq::from(TAG_NULLIFIER), secret, message])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = hash(&[Fq::from(1u64), Fq::from(2u64)]);
        let b = hash(&[Fq::from(1u64), Fq::from(2u64)]);
        assert_eq!(a, b);
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(
            hash_node(Fq::from(1u64), Fq::from(2u64)),
            hash_node(Fq::from(2u64), Fq::from(1u64))
        );
    }

    #[test]
    fn tags_separate_domains() {
        let s = Fq::from(42u64);
        let m = Fq::from(7u64);
        assert_ne!(hash_commitment(s), hash(&[s]));
        assert_ne!(hash_nullifier(s, m), hash_node(s, m));
    }

    #[test]
    fn params_are_cached() {
        assert!(std::ptr::eq(poseidon_params(), poseidon_params()));
    }
}
