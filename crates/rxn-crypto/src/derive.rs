//! # Commitment, Nullifier and Key Derivation
//!
//! - `member_secret(address)`: SHA-256 of a fixed label and the address,
//!   reduced into the field, never zero.
//! - `derive_commitment(address) = H(TAG_COMMITMENT, member_secret)`.
//! - `derive_nullifier(secret, message) = H(TAG_NULLIFIER, secret, message)`.
//!   One value per (member, message); unlinkable across messages.
//! - `derive_reaction_key` / `derive_feed_secret`: HKDF-SHA256 over a
//!   shared key, separated by info label and the target identifier.

use ark_ff::{One, Zero};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use rxn_core::{Commitment, FeedId, MemberAddress, MessageId, Nullifier};

use crate::error::CryptoError;
use crate::field::{fq_from_bytes_reduced, message_field, FieldEncoding, Fq};
use crate::poseidon;

const MEMBER_SECRET_LABEL: &[u8] = b"rxn/member-secret/v1";
const HKDF_SALT: &[u8] = b"rxn/hkdf-salt/v1";
const REACTION_KEY_INFO: &[u8] = b"rxn/reaction-key/v1";
const FEED_SECRET_INFO: &[u8] = b"rxn/feed-secret/v1";

/// 32 bytes of derived symmetric key material, cleared on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// The member's secret field element for an address.
pub fn member_secret(address: &MemberAddress) -> Fq {
    let mut hasher = Sha256::new();
    hasher.update(MEMBER_SECRET_LABEL);
    hasher.update(address.as_str().as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();
    let secret = fq_from_bytes_reduced(&digest);
    digest.zeroize();
    if secret.is_zero() {
        Fq::one()
    } else {
        secret
    }
}

/// Commitment of an already-derived secret.
pub fn commitment_from_secret(secret: &Fq) -> Commitment {
    Commitment::from_field(&poseidon::hash_commitment(*secret))
}

/// Deterministic commitment for a member address.
pub fn derive_commitment(address: &MemberAddress) -> Commitment {
    commitment_from_secret(&member_secret(address))
}

/// Per-(member, message) replay tag.
pub fn derive_nullifier(secret: &Fq, message_id: &MessageId) -> Nullifier {
    Nullifier::from_field(&poseidon::hash_nullifier(*secret, message_field(message_id)))
}

fn hkdf_expand(shared_key: &[u8], label: &[u8], id: &[u8]) -> Result<DerivedKey, CryptoError> {
    if shared_key.is_empty() {
        return Err(CryptoError::KeyDerivation("shared key is empty".into()));
    }
    let mut info = Vec::with_capacity(label.len() + id.len());
    info.extend_from_slice(label);
    info.extend_from_slice(id);
    let mut okm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(HKDF_SALT), shared_key)
        .expand(&info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(DerivedKey(okm))
}

/// Symmetric key for one message's reaction payloads.
pub fn derive_reaction_key(
    shared_key: &[u8],
    message_id: &MessageId,
) -> Result<DerivedKey, CryptoError> {
    hkdf_expand(shared_key, REACTION_KEY_INFO, message_id.as_bytes())
}

/// Feed-scoped secret.
pub fn derive_feed_secret(shared_key: &[u8], feed_id: &FeedId) -> Result<DerivedKey, CryptoError> {
    hkdf_expand(shared_key, FEED_SECRET_INFO, feed_id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn addr(s: &str) -> MemberAddress {
        MemberAddress::new(s).unwrap()
    }

    #[test]
    fn commitment_is_deterministic() {
        assert_eq!(derive_commitment(&addr("abc")), derive_commitment(&addr("abc")));
    }

    #[test]
    fn commitment_ignores_address_spelling() {
        assert_eq!(derive_commitment(&addr(" ABC ")), derive_commitment(&addr("abc")));
    }

    #[test]
    fn distinct_addresses_distinct_commitments() {
        assert_ne!(derive_commitment(&addr("alice")), derive_commitment(&addr("bob")));
    }

    #[test]
    fn secret_is_nonzero() {
        assert!(!member_secret(&addr("alice")).is_zero());
    }

    #[test]
    fn nullifier_per_message() {
        let s = member_secret(&addr("alice"));
        let m1 = MessageId(Uuid::from_u128(1));
        let m2 = MessageId(Uuid::from_u128(2));
        assert_eq!(derive_nullifier(&s, &m1), derive_nullifier(&s, &m1));
        assert_ne!(derive_nullifier(&s, &m1), derive_nullifier(&s, &m2));
    }

    #[test]
    fn nullifier_per_member() {
        let m = MessageId(Uuid::from_u128(1));
        let a = derive_nullifier(&member_secret(&addr("alice")), &m);
        let b = derive_nullifier(&member_secret(&addr("bob")), &m);
        assert_ne!(a, b);
    }

    #[test]
    fn reaction_key_unique_per_message() {
        let shared = [9u8; 32];
        let m1 = MessageId(Uuid::from_u128(1));
        let m2 = MessageId(Uuid::from_u128(2));
        let k1 = derive_reaction_key(&shared, &m1).unwrap();
        let k1b = derive_reaction_key(&shared, &m1).unwrap();
        let k2 = derive_reaction_key(&shared, &m2).unwrap();
        assert_eq!(k1.as_bytes(), k1b.as_bytes());
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn feed_secret_separated_from_reaction_key() {
        let shared = [9u8; 32];
        let id = Uuid::from_u128(77);
        let rk = derive_reaction_key(&shared, &MessageId(id)).unwrap();
        let fs = derive_feed_secret(&shared, &FeedId(id)).unwrap();
        assert_ne!(rk.as_bytes(), fs.as_bytes());
    }

    #[test]
    fn empty_shared_key_rejected() {
        assert!(matches!(
            derive_feed_secret(&[], &FeedId::new()),
            Err(CryptoError::KeyDerivation(_))
        ));
    }

    #[test]
    fn debug_hides_key_bytes() {
        let k = derive_feed_secret(&[1u8; 32], &FeedId::new()).unwrap();
        assert_eq!(format!("{k:?}"), "DerivedKey(..)");
    }

    proptest! {
        #[test]
        fn commitment_is_canonical_field(s in "[a-f0-9]{8,64}") {
            let c = derive_commitment(&addr(&s));
            prop_assert!(crate::field::fq_from_bytes(c.as_bytes()).is_ok());
        }
    }
}
