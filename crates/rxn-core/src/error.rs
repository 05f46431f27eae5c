//! # Error Types
//!
//! Errors raised while constructing or decoding the foundational types.
//! Everything above this crate wraps `CoreError` in its own error enum.

use thiserror::Error;

/// Errors from constructing core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    /// A fixed-width value had the wrong number of bytes.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required byte length.
        expected: usize,
        /// Observed byte length.
        actual: usize,
    },

    /// An identifier failed validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The four ciphertext component arrays disagree in length.
    #[error("ciphertext component arrays have mismatched lengths: {0}")]
    CiphertextShape(String),
}
