//! # Field Element Encoding
//!
//! The BN254 scalar field is the base field of Baby Jubjub and the input
//! field of Poseidon and the Groth16 verifier. Every 32-byte value on the
//! wire (commitments, nullifiers, roots, coordinates) is a big-endian
//! encoding of one element of this field.
//!
//! Decoding is strict: a 32-byte string whose integer value is `>= p` is
//! rejected rather than silently reduced. Two distinct byte strings must
//! never name the same element, otherwise a nullifier could be replayed
//! under a second spelling.

use ark_ff::{BigInteger, PrimeField};

use rxn_core::{Commitment, FieldBytes, MerkleRoot, MessageId, Nullifier};

use crate::error::CryptoError;

/// The BN254 scalar field (Baby Jubjub base field).
pub type Fq = ark_bn254::Fr;

/// Width of an encoded field element.
pub const FIELD_BYTES: usize = 32;

/// Encode a field element as 32 big-endian bytes.
pub fn fq_to_bytes(value: &Fq) -> [u8; FIELD_BYTES] {
    let raw = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    out[FIELD_BYTES - raw.len()..].copy_from_slice(&raw);
    out
}

/// Decode 32 big-endian bytes, rejecting values outside `[0, p)`.
pub fn fq_from_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Fq, CryptoError> {
    let value = Fq::from_be_bytes_mod_order(bytes);
    if &fq_to_bytes(&value) != bytes {
        return Err(CryptoError::NonCanonicalField(hex::encode(bytes)));
    }
    Ok(value)
}

/// Reduce arbitrary bytes into the field. Only for hash outputs.
pub fn fq_from_bytes_reduced(bytes: &[u8]) -> Fq {
    Fq::from_be_bytes_mod_order(bytes)
}

/// The field image of a message identifier (its 16 UUID bytes).
pub fn message_field(message_id: &MessageId) -> Fq {
    Fq::from_be_bytes_mod_order(message_id.as_bytes())
}

/// Conversions between the byte newtypes of `rxn-core` and field elements.
pub trait FieldEncoding: Sized {
    /// Decode strictly into the field.
    fn to_field(&self) -> Result<Fq, CryptoError>;
    /// Encode a field element.
    fn from_field(value: &Fq) -> Self;
}

macro_rules! field_encoding {
    ($($ty:ty),*) => {
        $(
            impl FieldEncoding for $ty {
                fn to_field(&self) -> Result<Fq, CryptoError> {
                    fq_from_bytes(self.as_bytes())
                }

                fn from_field(value: &Fq) -> Self {
                    <$ty>::from_bytes(fq_to_bytes(value))
                }
            }
        )*
    };
}

field_encoding!(Commitment, Nullifier, MerkleRoot, FieldBytes);

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, Zero};

    /// p - 1 for BN254, big-endian.
    const P_MINUS_ONE: &str = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000000";
    /// p for BN254, big-endian.
    const P: &str = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

    fn decode(hex_str: &str) -> [u8; 32] {
        hex::decode(hex_str).unwrap().try_into().unwrap()
    }

    #[test]
    fn small_values_are_right_aligned() {
        let bytes = fq_to_bytes(&Fq::from(258u64));
        assert_eq!(bytes[30], 1);
        assert_eq!(bytes[31], 2);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn zero_and_one_roundtrip() {
        assert_eq!(fq_from_bytes(&fq_to_bytes(&Fq::zero())).unwrap(), Fq::zero());
        assert_eq!(fq_from_bytes(&fq_to_bytes(&Fq::one())).unwrap(), Fq::one());
    }

    #[test]
    fn largest_element_accepted() {
        let v = fq_from_bytes(&decode(P_MINUS_ONE)).unwrap();
        assert_eq!(v + Fq::one(), Fq::zero());
    }

    #[test]
    fn modulus_rejected() {
        assert!(matches!(
            fq_from_bytes(&decode(P)),
            Err(CryptoError::NonCanonicalField(_))
        ));
        assert!(fq_from_bytes(&[0xff; 32]).is_err());
    }

    #[test]
    fn newtype_encoding() {
        let n = Nullifier::from_field(&Fq::from(7u64));
        assert_eq!(n.as_bytes()[31], 7);
        assert_eq!(n.to_field().unwrap(), Fq::from(7u64));
    }

    #[test]
    fn message_field_is_uuid_integer() {
        let id = MessageId(uuid::Uuid::from_u128(0x0102));
        assert_eq!(message_field(&id), Fq::from(0x0102u64));
    }
}
