//! # Additive ElGamal on Baby Jubjub
//!
//! `Enc(m; r) = (r·G, m·G + r·PK)`. Component-wise addition of two
//! ciphertexts under the same key encrypts the sum of their plaintexts, so
//! the server can fold votes into a running tally without ever seeing
//! them. Subtraction adds the negation and undoes an earlier fold.
//!
//! Decryption recovers `m·G`; the count `m` is found by bounded search,
//! which is cheap because a tally slot never exceeds the member count.

use ark_ec::{AffineRepr, CurveGroup};
use ark_std::rand::Rng;
use ark_std::UniformRand;
use zeroize::Zeroize;

use rxn_core::{CurvePoint, ElGamalCiphertext, VoteCiphertext};

use crate::curve::{self, decode_point, encode_point, Point, Scalar};
use crate::error::CryptoError;

/// A reaction-decryption key pair.
///
/// The secret scalar is cleared on drop and never serialized.
pub struct ElGamalKeypair {
    secret: Scalar,
    public: Point,
}

impl ElGamalKeypair {
    /// Generate a fresh key pair.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_secret(Scalar::rand(rng))
    }

    /// Rebuild from a known secret scalar.
    pub fn from_secret(secret: Scalar) -> Self {
        let public = curve::mul_generator(&secret);
        Self { secret, public }
    }

    /// The public key, encoded.
    pub fn public_key(&self) -> CurvePoint {
        encode_point(&self.public)
    }

    /// The secret scalar.
    pub fn secret(&self) -> &Scalar {
        &self.secret
    }

    /// Decrypt one ciphertext to its plaintext point `m·G`.
    pub fn decrypt(&self, ct: &ElGamalCiphertext) -> Result<CurvePoint, CryptoError> {
        Ok(encode_point(&self.decrypt_point(ct)?))
    }

    fn decrypt_point(&self, ct: &ElGamalCiphertext) -> Result<Point, CryptoError> {
        let c1 = decode_point(&ct.c1)?;
        let c2 = decode_point(&ct.c2)?;
        let shared = curve::mul(&c1, &self.secret);
        Ok((c2 + (-shared)).into_affine())
    }

    /// Decrypt a ciphertext known to hold a small count.
    ///
    /// Returns `None` when the plaintext is not in `0..=max`.
    pub fn decrypt_count(
        &self,
        ct: &ElGamalCiphertext,
        max: u64,
    ) -> Result<Option<u64>, CryptoError> {
        let target = self.decrypt_point(ct)?;
        let g = curve::generator();
        let mut acc = Point::zero();
        for m in 0..=max {
            if acc == target {
                return Ok(Some(m));
            }
            acc = (acc + g).into_affine();
        }
        Ok(None)
    }

    /// Decrypt every slot of a tally.
    ///
    /// Slots whose count exceeds `max` are reported as `None`.
    pub fn decrypt_tally(
        &self,
        tally: &VoteCiphertext,
        max: u64,
    ) -> Result<Vec<Option<u64>>, CryptoError> {
        tally
            .iter()
            .map(|ct| self.decrypt_count(ct, max))
            .collect()
    }
}

impl Drop for ElGamalKeypair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for ElGamalKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElGamalKeypair")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Encrypt the small integer `m` under `pk` with randomness `r`.
pub fn encrypt(pk: &CurvePoint, m: u64, r: &Scalar) -> Result<ElGamalCiphertext, CryptoError> {
    let pk = decode_point(pk)?;
    let c1 = curve::mul_generator(r);
    let message = curve::mul_generator(&Scalar::from(m));
    let c2 = (message + curve::mul(&pk, r)).into_affine();
    Ok(ElGamalCiphertext {
        c1: encode_point(&c1),
        c2: encode_point(&c2),
    })
}

/// Encrypt a one-hot vote for `slot` across `slots` reaction slots.
pub fn encrypt_vote<R: Rng + ?Sized>(
    pk: &CurvePoint,
    slot: usize,
    slots: usize,
    rng: &mut R,
) -> Result<VoteCiphertext, CryptoError> {
    if slot >= slots {
        return Err(CryptoError::SlotOutOfRange { slot, slots });
    }
    let mut out = Vec::with_capacity(slots);
    for i in 0..slots {
        let mut r = Scalar::rand(rng);
        out.push(encrypt(pk, u64::from(i == slot), &r)?);
        r.zeroize();
    }
    Ok(VoteCiphertext(out))
}

/// Component-wise homomorphic addition.
pub fn add_ciphertexts(
    a: &ElGamalCiphertext,
    b: &ElGamalCiphertext,
) -> Result<ElGamalCiphertext, CryptoError> {
    Ok(ElGamalCiphertext {
        c1: curve::add(&a.c1, &b.c1)?,
        c2: curve::add(&a.c2, &b.c2)?,
    })
}

/// Component-wise homomorphic subtraction, `a - b`.
pub fn sub_ciphertexts(
    a: &ElGamalCiphertext,
    b: &ElGamalCiphertext,
) -> Result<ElGamalCiphertext, CryptoError> {
    Ok(ElGamalCiphertext {
        c1: curve::add(&a.c1, &curve::negate(&b.c1)?)?,
        c2: curve::add(&a.c2, &curve::negate(&b.c2)?)?,
    })
}

fn zip_votes<F>(a: &VoteCiphertext, b: &VoteCiphertext, op: F) -> Result<VoteCiphertext, CryptoError>
where
    F: Fn(&ElGamalCiphertext, &ElGamalCiphertext) -> Result<ElGamalCiphertext, CryptoError>,
{
    if a.len() != b.len() {
        return Err(CryptoError::WidthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| op(x, y))
        .collect::<Result<Vec<_>, _>>()
        .map(VoteCiphertext)
}

/// Slot-wise sum of two vote vectors of equal width.
pub fn add_votes(a: &VoteCiphertext, b: &VoteCiphertext) -> Result<VoteCiphertext, CryptoError> {
    zip_votes(a, b, add_ciphertexts)
}

/// Slot-wise difference of two vote vectors of equal width.
pub fn sub_votes(a: &VoteCiphertext, b: &VoteCiphertext) -> Result<VoteCiphertext, CryptoError> {
    zip_votes(a, b, sub_ciphertexts)
}

/// Validate every point of a vote vector.
pub fn validate_vote(vote: &VoteCiphertext) -> Result<(), CryptoError> {
    for ct in vote.iter() {
        decode_point(&ct.c1)?;
        decode_point(&ct.c2)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn keypair(seed: u64) -> (ElGamalKeypair, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        (ElGamalKeypair::generate(&mut rng), rng)
    }

    #[test]
    fn encrypt_decrypt_count() {
        let (kp, mut rng) = keypair(1);
        let r = Scalar::rand(&mut rng);
        let ct = encrypt(&kp.public_key(), 5, &r).unwrap();
        assert_eq!(kp.decrypt_count(&ct, 10).unwrap(), Some(5));
        assert_eq!(kp.decrypt_count(&ct, 4).unwrap(), None);
    }

    #[test]
    fn identity_ciphertext_decrypts_to_zero() {
        let (kp, _) = keypair(2);
        assert_eq!(
            kp.decrypt_count(&ElGamalCiphertext::identity(), 0).unwrap(),
            Some(0)
        );
    }

    #[test]
    fn one_hot_vote() {
        let (kp, mut rng) = keypair(3);
        let vote = encrypt_vote(&kp.public_key(), 2, 6, &mut rng).unwrap();
        let counts = kp.decrypt_tally(&vote, 1).unwrap();
        assert_eq!(
            counts,
            vec![Some(0), Some(0), Some(1), Some(0), Some(0), Some(0)]
        );
    }

    #[test]
    fn slot_out_of_range() {
        let (kp, mut rng) = keypair(4);
        assert!(matches!(
            encrypt_vote(&kp.public_key(), 6, 6, &mut rng),
            Err(CryptoError::SlotOutOfRange { slot: 6, slots: 6 })
        ));
    }

    #[test]
    fn homomorphic_sum_of_votes() {
        let (kp, mut rng) = keypair(5);
        let pk = kp.public_key();
        let mut tally = VoteCiphertext::identity(3);
        for slot in [0, 1, 1, 2, 1] {
            let vote = encrypt_vote(&pk, slot, 3, &mut rng).unwrap();
            tally = add_votes(&tally, &vote).unwrap();
        }
        let counts = kp.decrypt_tally(&tally, 5).unwrap();
        assert_eq!(counts, vec![Some(1), Some(3), Some(1)]);
    }

    #[test]
    fn subtract_undoes_add() {
        let (kp, mut rng) = keypair(6);
        let pk = kp.public_key();
        let first = encrypt_vote(&pk, 0, 2, &mut rng).unwrap();
        let second = encrypt_vote(&pk, 1, 2, &mut rng).unwrap();
        let tally = add_votes(&VoteCiphertext::identity(2), &first).unwrap();
        let swapped = add_votes(&sub_votes(&tally, &first).unwrap(), &second).unwrap();
        assert_eq!(
            kp.decrypt_tally(&swapped, 2).unwrap(),
            vec![Some(0), Some(1)]
        );
    }

    #[test]
    fn width_mismatch_rejected() {
        let a = VoteCiphertext::identity(2);
        let b = VoteCiphertext::identity(3);
        assert!(matches!(
            add_votes(&a, &b),
            Err(CryptoError::WidthMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn rebuild_from_secret() {
        let (kp, _) = keypair(8);
        let again = ElGamalKeypair::from_secret(*kp.secret());
        assert_eq!(kp.public_key(), again.public_key());
    }
}
