//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `rxn-crypto`.
//! Uses `thiserror` for ergonomic error definitions with diagnostic context.

use rxn_core::CoreError;
use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A 32-byte value is not the canonical encoding of a field element.
    #[error("non-canonical field element: {0}")]
    NonCanonicalField(String),

    /// A point failed the curve equation or the prime-order subgroup check.
    #[error("point is not on the curve subgroup: {0}")]
    InvalidPoint(String),

    /// Two ciphertext vectors of different widths were combined.
    #[error("ciphertext width mismatch: expected {expected} slots, got {actual}")]
    WidthMismatch {
        /// Slots on the left-hand side.
        expected: usize,
        /// Slots on the right-hand side.
        actual: usize,
    },

    /// A reaction slot index is outside the vote width.
    #[error("reaction slot {slot} out of range for {slots} slots")]
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Vote width.
        slots: usize,
    },

    /// The membership tree cannot hold more leaves.
    #[error("membership tree full: {count} leaves exceed capacity {capacity}")]
    TreeFull {
        /// Leaves requested.
        count: usize,
        /// Maximum leaves at the fixed depth.
        capacity: usize,
    },

    /// A leaf index does not address an occupied leaf.
    #[error("leaf index {index} out of range ({len} leaves)")]
    LeafOutOfRange {
        /// Requested index.
        index: usize,
        /// Occupied leaves.
        len: usize,
    },

    /// HKDF rejected the derivation request.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Secret key material was malformed.
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// A secret provider could not supply key material.
    #[error("secret unavailable: {0}")]
    SecretUnavailable(String),

    /// Decoding a foundational type failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_mismatch_display() {
        let err = CryptoError::WidthMismatch {
            expected: 6,
            actual: 5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("6 slots"));
        assert!(msg.contains("5"));
    }

    #[test]
    fn core_error_is_transparent() {
        let err: CryptoError = CoreError::InvalidHex("zz".into()).into();
        assert_eq!(err.to_string(), "invalid hex encoding: zz");
    }

    #[test]
    fn tree_full_display() {
        let err = CryptoError::TreeFull {
            count: 3,
            capacity: 2,
        };
        assert!(err.to_string().contains("capacity 2"));
    }
}
