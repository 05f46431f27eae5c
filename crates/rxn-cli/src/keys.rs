//! Symmetric key derivation and feed key generation.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use rxn_core::{FeedId, MessageId};
use rxn_crypto::curve::scalar_to_bytes;
use rxn_crypto::{derive_feed_secret, derive_reaction_key, ElGamalKeypair};

use crate::print_json;

/// `rxn reaction-key <shared-key-hex> <message-id>`
#[derive(Args, Debug)]
pub struct ReactionKeyArgs {
    /// Shared feed key, hex.
    pub shared_key: String,
    /// Message UUID.
    pub message_id: Uuid,
}

/// `rxn feed-secret <shared-key-hex> <feed-id>`
#[derive(Args, Debug)]
pub struct FeedSecretArgs {
    /// Shared feed key, hex.
    pub shared_key: String,
    /// Feed UUID.
    pub feed_id: Uuid,
}

/// `rxn feed-keygen`
#[derive(Args, Debug)]
pub struct FeedKeygenArgs {}

/// A freshly generated feed ElGamal key pair.
#[derive(Debug, Serialize)]
pub struct FeedKeyReport {
    /// Secret scalar, big-endian hex. Keep offline.
    pub secret_key: String,
    pub public_key: rxn_core::CurvePoint,
}

fn decode_shared_key(raw: &str) -> Result<Zeroizing<Vec<u8>>> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(Zeroizing::new(
        hex::decode(digits).context("shared key is not valid hex")?,
    ))
}

pub fn reaction_key_hex(shared_key: &str, message_id: &MessageId) -> Result<String> {
    let shared = decode_shared_key(shared_key)?;
    let key = derive_reaction_key(&shared, message_id)?;
    Ok(hex::encode(key.as_bytes()))
}

pub fn feed_secret_hex(shared_key: &str, feed_id: &FeedId) -> Result<String> {
    let shared = decode_shared_key(shared_key)?;
    let key = derive_feed_secret(&shared, feed_id)?;
    Ok(hex::encode(key.as_bytes()))
}

pub fn run_reaction_key(args: &ReactionKeyArgs) -> Result<u8> {
    println!("{}", reaction_key_hex(&args.shared_key, &MessageId(args.message_id))?);
    Ok(0)
}

pub fn run_feed_secret(args: &FeedSecretArgs) -> Result<u8> {
    println!("{}", feed_secret_hex(&args.shared_key, &FeedId(args.feed_id))?);
    Ok(0)
}

pub fn run_feed_keygen(_args: &FeedKeygenArgs) -> Result<u8> {
    let keypair = ElGamalKeypair::generate(&mut rand::rngs::OsRng);
    let report = FeedKeyReport {
        secret_key: hex::encode(scalar_to_bytes(keypair.secret())),
        public_key: keypair.public_key(),
    };
    print_json(&report)?;
    Ok(0)
}
