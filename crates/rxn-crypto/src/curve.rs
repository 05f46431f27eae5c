//! # Baby Jubjub Arithmetic
//!
//! Twisted Edwards curve `a·x² + y² = 1 + d·x²·y²` over the BN254 scalar
//! field (a = 168700, d = 168696). Points travel as two 32-byte big-endian
//! coordinates ([`CurvePoint`]); this module is the only place they are
//! decoded into curve elements.
//!
//! ## Security Invariants
//!
//! - Decoding checks the curve equation AND membership in the prime-order
//!   subgroup. A low-order point folded into a tally would poison every
//!   later sum, so the subgroup check is not optional.
//! - Coordinates must be canonical field encodings.
//! - Scalar multiplication runs a fixed-length ladder: the same sequence of
//!   additions and doublings for every scalar of the field's bit width.

use ark_ec::{AffineRepr, CurveGroup, Group};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsProjective};
use ark_ff::{BigInteger, PrimeField, Zero};

use rxn_core::{CurvePoint, FieldBytes};

use crate::error::CryptoError;
use crate::field::{fq_from_bytes, fq_to_bytes};

/// A decoded, validated Baby Jubjub point.
pub type Point = EdwardsAffine;

/// The prime-order subgroup's scalar field.
pub type Scalar = ark_ed_on_bn254::Fr;

/// The subgroup generator.
pub fn generator() -> Point {
    EdwardsAffine::generator()
}

/// The neutral element `(0, 1)`.
pub fn identity() -> Point {
    EdwardsAffine::zero()
}

/// Decode and validate an encoded point.
pub fn decode_point(point: &CurvePoint) -> Result<Point, CryptoError> {
    let x = fq_from_bytes(point.x.as_bytes())?;
    let y = fq_from_bytes(point.y.as_bytes())?;
    let p = EdwardsAffine::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(CryptoError::InvalidPoint(format!(
            "({}, {}) fails the curve equation",
            point.x, point.y
        )));
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CryptoError::InvalidPoint(format!(
            "({}, {}) is outside the prime-order subgroup",
            point.x, point.y
        )));
    }
    Ok(p)
}

/// Encode a point as big-endian coordinates.
pub fn encode_point(point: &Point) -> CurvePoint {
    CurvePoint {
        x: FieldBytes::from_bytes(fq_to_bytes(&point.x)),
        y: FieldBytes::from_bytes(fq_to_bytes(&point.y)),
    }
}

/// Whether the encoding names a valid subgroup point.
pub fn is_on_curve(point: &CurvePoint) -> bool {
    decode_point(point).is_ok()
}

/// Point addition on encoded points.
pub fn add(a: &CurvePoint, b: &CurvePoint) -> Result<CurvePoint, CryptoError> {
    let sum = (decode_point(a)? + decode_point(b)?).into_affine();
    Ok(encode_point(&sum))
}

/// Point negation, `(x, y) -> (-x, y)`.
pub fn negate(point: &CurvePoint) -> Result<CurvePoint, CryptoError> {
    Ok(encode_point(&-decode_point(point)?))
}

/// Scalar multiplication on an encoded point.
pub fn scalar_mul(scalar: &Scalar, point: &CurvePoint) -> Result<CurvePoint, CryptoError> {
    Ok(encode_point(&mul(&decode_point(point)?, scalar)))
}

/// Montgomery ladder over the full bit width of the scalar.
pub(crate) fn mul(point: &Point, scalar: &Scalar) -> Point {
    let mut r0 = EdwardsProjective::zero();
    let mut r1 = point.into_group();
    for bit in scalar.into_bigint().to_bits_be() {
        if bit {
            r0 += r1;
            r1.double_in_place();
        } else {
            r1 += r0;
            r0.double_in_place();
        }
    }
    r0.into_affine()
}

/// `scalar · G`.
pub(crate) fn mul_generator(scalar: &Scalar) -> Point {
    mul(&generator(), scalar)
}

/// Decode a secret scalar from 32 big-endian bytes, strictly.
pub fn scalar_from_bytes(bytes: &[u8; 32]) -> Result<Scalar, CryptoError> {
    let value = Scalar::from_be_bytes_mod_order(bytes);
    if &scalar_to_bytes(&value) != bytes {
        return Err(CryptoError::InvalidSecretKey(
            "scalar is not reduced modulo the subgroup order".into(),
        ));
    }
    Ok(value)
}

/// Encode a scalar as 32 big-endian bytes.
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; 32] {
    let raw = scalar.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(&raw);
    out
}
