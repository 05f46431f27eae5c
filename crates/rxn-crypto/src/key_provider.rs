//! # Secret Provider Abstraction
//!
//! The member's local identity is an Ed25519 signing key. Its hex-encoded
//! verifying key is the member's address, and the membership secret (and
//! so the commitment and every nullifier) is derived from that address.
//!
//! - [`LocalSecretProvider`]: In-memory key for development and testing.
//! - [`EnvSecretProvider`]: Loads the 32-byte seed from a hex-encoded
//!   environment variable, for container deployments where secrets are
//!   injected via environment.
//!
//! ## Security Invariants
//!
//! - Key material is zeroized on drop (`ed25519-dalek` with `zeroize`).
//! - `SecretProvider` is `Send + Sync` for use across async tasks.
//! - Derivation is deterministic: two `LocalIdentity` values over the same
//!   key always yield the same secret and commitment.

use std::sync::Arc;

use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::Zeroizing;

use rxn_core::{Commitment, MemberAddress, MessageId, Nullifier};

use crate::derive;
use crate::error::CryptoError;
use crate::field::Fq;

/// Trait for local signing-key storage backends.
pub trait SecretProvider: Send + Sync {
    /// Return the Ed25519 verifying (public) key.
    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError>;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

// ─── LocalSecretProvider ─────────────────────────────────────────────

/// In-memory key provider for development and testing.
pub struct LocalSecretProvider {
    key: SigningKey,
}

impl LocalSecretProvider {
    /// Create from an existing signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Create from raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }
}

impl SecretProvider for LocalSecretProvider {
    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        Ok(self.key.verifying_key())
    }

    fn provider_name(&self) -> &str {
        "LocalSecretProvider"
    }
}

// ─── EnvSecretProvider ───────────────────────────────────────────────

/// Loads the signing key from an environment variable.
///
/// The variable must contain a 64-character hex string encoding the
/// 32-byte Ed25519 seed.
///
/// ```bash
/// export RXN_SIGNING_KEY="deadbeef..."  # 64 hex chars
/// ```
pub struct EnvSecretProvider {
    key: SigningKey,
    var_name: String,
}

impl EnvSecretProvider {
    /// Load the signing key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let raw = Zeroizing::new(std::env::var(var_name).map_err(|_| {
            CryptoError::SecretUnavailable(format!("environment variable {var_name} not set"))
        })?);
        Self::from_hex(var_name, &raw)
    }

    /// Parse a hex seed attributed to `var_name`.
    pub fn from_hex(var_name: &str, hex_seed: &str) -> Result<Self, CryptoError> {
        let trimmed = hex_seed.trim();
        let bytes = Zeroizing::new(hex::decode(trimmed).map_err(|e| {
            CryptoError::InvalidSecretKey(format!("{var_name} is not valid hex: {e}"))
        })?);
        let seed: Zeroizing<[u8; 32]> =
            Zeroizing::new(bytes.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidSecretKey(format!(
                    "expected 32 bytes (64 hex chars) in {var_name}, got {} bytes",
                    bytes.len()
                ))
            })?);
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
            var_name: var_name.to_string(),
        })
    }

    /// Return the environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl SecretProvider for EnvSecretProvider {
    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        Ok(self.key.verifying_key())
    }

    fn provider_name(&self) -> &str {
        "EnvSecretProvider"
    }
}

// ─── LocalIdentity ───────────────────────────────────────────────────

/// The local member, as seen by client-side helpers.
#[derive(Clone)]
pub struct LocalIdentity {
    provider: Arc<dyn SecretProvider>,
}

impl LocalIdentity {
    /// Wrap a provider.
    pub fn new(provider: Arc<dyn SecretProvider>) -> Self {
        Self { provider }
    }

    /// Name of the backing provider.
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// The local address: lowercase hex of the verifying key.
    pub fn address(&self) -> Result<MemberAddress, CryptoError> {
        let vk = self.provider.verifying_key()?;
        Ok(MemberAddress::new(hex::encode(vk.as_bytes()))?)
    }

    /// Non-zero membership secret of the local member.
    pub fn derive_local_secret(&self) -> Result<Fq, CryptoError> {
        Ok(derive::member_secret(&self.address()?))
    }

    /// Commitment of the local member; equals `derive_commitment(address)`.
    pub fn derive_local_commitment(&self) -> Result<Commitment, CryptoError> {
        Ok(derive::commitment_from_secret(&self.derive_local_secret()?))
    }

    /// Nullifier the local member would publish for `message_id`.
    pub fn nullifier_for(&self, message_id: &MessageId) -> Result<Nullifier, CryptoError> {
        Ok(derive::derive_nullifier(
            &self.derive_local_secret()?,
            message_id,
        ))
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}
