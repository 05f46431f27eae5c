//! # Service Errors
//!
//! Protocol rejections (bad ciphertext, unknown feed, invalid proof) are
//! not errors: they travel as `SubmitReactionResult` values. What remains
//! here are infrastructure faults, which propagate to the caller.
//!
//! Callers render a fault with [`ServiceError::public_message`], which
//! never carries the underlying detail. The detail is logged where the
//! fault surfaces.

use rxn_core::CoreError;
use rxn_crypto::CryptoError;
use rxn_zkp::VerifyError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by repository implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// An optimistic check failed: the row changed since it was read, or a
    /// row that must be new already exists. Retryable.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The database driver failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value violates a type invariant.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A root could not be computed over the stored leaf set.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl StorageError {
    /// Whether retrying the whole read-modify-write may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Infrastructure faults surfaced by the services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The proof verifier itself failed (not a rejected proof).
    #[error(transparent)]
    Verifier(#[from] VerifyError),

    /// Curve or tree arithmetic failed on data that passed validation.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An upstream value could not be parsed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Tally version conflicts persisted through every retry.
    #[error("tally update still conflicting after {attempts} attempts")]
    ConcurrencyExhausted {
        /// Attempts made, including the first.
        attempts: u32,
    },

    /// A collaborator (feed info, chain height) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServiceError {
    /// Machine-readable code for the fault class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Verifier(_) => "VERIFIER_UNAVAILABLE",
            Self::Crypto(_) | Self::Core(_) => "INTERNAL_ERROR",
            Self::ConcurrencyExhausted { .. } => "CONCURRENCY_EXHAUSTED",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Config(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Message safe to hand to an external caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Verifier(_) => "Proof verification is temporarily unavailable",
            Self::ConcurrencyExhausted { .. } => "The reaction could not be recorded; retry later",
            Self::Upstream(_) => "An upstream service error occurred",
            _ => "An internal error occurred",
        }
    }

    /// Whether a client may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Verifier(_) | Self::ConcurrencyExhausted { .. } | Self::Upstream(_) => true,
            Self::Storage(e) => e.is_conflict(),
            _ => false,
        }
    }
}
