//! # Fixed-Width Values
//!
//! 32-byte big-endian encodings of field elements. Each role gets its own
//! type so a nullifier cannot be stored where a commitment is expected,
//! even though both are the same width on the wire.
//!
//! The serde representation is a lowercase hex string (64 chars). Decoding
//! accepts an optional `0x` prefix and either case.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Decode a hex string into exactly 32 bytes.
fn decode_32(input: &str) -> Result<[u8; 32], CoreError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let raw = hex::decode(digits).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
    slice_to_32(&raw)
}

fn slice_to_32(raw: &[u8]) -> Result<[u8; 32], CoreError> {
    raw.try_into().map_err(|_| CoreError::InvalidLength {
        expected: 32,
        actual: raw.len(),
    })
}

macro_rules! bytes32_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw big-endian bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Copy from a slice, rejecting anything that is not 32 bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
                slice_to_32(bytes).map(Self)
            }

            /// Parse from hex (optional `0x` prefix).
            pub fn from_hex(input: &str) -> Result<Self, CoreError> {
                decode_32(input).map(Self)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex rendering without prefix.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

bytes32_type!(
    /// A member's hiding commitment within one feed.
    Commitment
);

bytes32_type!(
    /// Per-(member, message) replay tag published with a reaction.
    Nullifier
);

bytes32_type!(
    /// Root of a feed's membership tree.
    MerkleRoot
);

bytes32_type!(
    /// A single encoded field element (curve coordinate, public input).
    FieldBytes
);
