//! # Submission Request and Result
//!
//! The transport-agnostic shapes of a reaction submission, and the closed
//! set of rejection codes a caller can receive.

use std::fmt;

use serde::{Deserialize, Serialize};

use rxn_core::{FeedId, FieldBytes, MessageId, Nullifier, TransactionId};

/// One anonymous reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReactionRequest {
    /// Feed the message belongs to.
    pub feed_id: FeedId,
    /// Message reacted to.
    pub message_id: MessageId,
    /// Replay tag derived from the member secret and the message.
    pub nullifier: Nullifier,
    /// Ephemeral x coordinates, one per reaction slot.
    pub ciphertext_c1x: Vec<FieldBytes>,
    /// Ephemeral y coordinates.
    pub ciphertext_c1y: Vec<FieldBytes>,
    /// Payload x coordinates.
    pub ciphertext_c2x: Vec<FieldBytes>,
    /// Payload y coordinates.
    pub ciphertext_c2y: Vec<FieldBytes>,
    /// Serialized proof.
    pub proof: Vec<u8>,
    /// Circuit the proof was produced for.
    pub circuit_version: String,
    /// Client-encrypted copy of the plaintext reaction.
    #[serde(default)]
    pub encrypted_backup: Option<Vec<u8>>,
}

/// Closed set of expected rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionErrorCode {
    /// A ciphertext column has the wrong length.
    InvalidCiphertextSize,
    /// A ciphertext point is not a valid subgroup point.
    InvalidCiphertextPoint,
    /// The feed has no public key.
    FeedNotFound,
    /// The message has no author commitment.
    MessageNotFound,
    /// The feed has no root history yet.
    NoMerkleRoots,
    /// The proof verified against no root in the window.
    InvalidProof,
}

impl ReactionErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCiphertextSize => "INVALID_CIPHERTEXT_SIZE",
            Self::InvalidCiphertextPoint => "INVALID_CIPHERTEXT_POINT",
            Self::FeedNotFound => "FEED_NOT_FOUND",
            Self::MessageNotFound => "MESSAGE_NOT_FOUND",
            Self::NoMerkleRoots => "NO_MERKLE_ROOTS",
            Self::InvalidProof => "INVALID_PROOF",
        }
    }
}

impl fmt::Display for ReactionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submission stopped at a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Which gate.
    pub code: ReactionErrorCode,
    /// Caller-safe detail.
    pub message: String,
}

impl Rejection {
    /// Build a rejection.
    pub fn new(code: ReactionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Outcome returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReactionResult {
    /// Whether the reaction was recorded.
    pub success: bool,
    /// Rejection code, on failure.
    pub error_code: Option<ReactionErrorCode>,
    /// Rejection detail, on failure.
    pub error_message: Option<String>,
    /// Audit row identifier, on success.
    pub transaction_id: Option<TransactionId>,
}

impl SubmitReactionResult {
    /// A recorded reaction.
    pub fn accepted(transaction_id: TransactionId) -> Self {
        Self {
            success: true,
            error_code: None,
            error_message: None,
            transaction_id: Some(transaction_id),
        }
    }
}

impl From<Rejection> for SubmitReactionResult {
    fn from(r: Rejection) -> Self {
        Self {
            success: false,
            error_code: Some(r.code),
            error_message: Some(r.message),
            transaction_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_wire_names() {
        for code in [
            ReactionErrorCode::InvalidCiphertextSize,
            ReactionErrorCode::InvalidCiphertextPoint,
            ReactionErrorCode::FeedNotFound,
            ReactionErrorCode::MessageNotFound,
            ReactionErrorCode::NoMerkleRoots,
            ReactionErrorCode::InvalidProof,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn rejection_into_result() {
        let r: SubmitReactionResult =
            Rejection::new(ReactionErrorCode::FeedNotFound, "no key").into();
        assert!(!r.success);
        assert_eq!(r.error_code, Some(ReactionErrorCode::FeedNotFound));
        assert!(r.transaction_id.is_none());
    }

    #[test]
    fn backup_defaults_to_none() {
        let req = SubmitReactionRequest {
            feed_id: FeedId::new(),
            message_id: MessageId::new(),
            nullifier: Nullifier::default(),
            ciphertext_c1x: vec![],
            ciphertext_c1y: vec![],
            ciphertext_c2x: vec![],
            ciphertext_c2y: vec![],
            proof: vec![],
            circuit_version: "reaction-v1".into(),
            encrypted_backup: None,
        };
        let mut value = serde_json::to_value(&req).unwrap();
        value.as_object_mut().unwrap().remove("encrypted_backup");
        let back: SubmitReactionRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, req);
    }
}
