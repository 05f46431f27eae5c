//! Member commitments.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use rxn_core::MemberAddress;
use rxn_crypto::{derive_commitment, EnvSecretProvider, LocalIdentity};

use crate::print_json;

/// `rxn commitment <address>`
#[derive(Args, Debug)]
pub struct CommitmentArgs {
    /// Member address (hex verifying key).
    pub address: String,
}

/// `rxn local-identity`
#[derive(Args, Debug)]
pub struct LocalIdentityArgs {
    /// Environment variable holding the 32-byte Ed25519 seed in hex.
    #[arg(long, default_value = "RXN_SIGNING_KEY")]
    pub key_env: String,
}

/// Address and commitment of the local member.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LocalIdentityReport {
    pub provider: String,
    pub address: String,
    pub commitment: String,
}

pub fn run_commitment(args: &CommitmentArgs) -> Result<u8> {
    let address = MemberAddress::new(&args.address).context("invalid member address")?;
    println!("{}", derive_commitment(&address));
    Ok(0)
}

pub fn run_local_identity(args: &LocalIdentityArgs) -> Result<u8> {
    let provider = EnvSecretProvider::from_env(&args.key_env)?;
    let report = local_identity_report(&LocalIdentity::new(Arc::new(provider)))?;
    print_json(&report)?;
    Ok(0)
}

pub fn local_identity_report(identity: &LocalIdentity) -> Result<LocalIdentityReport> {
    Ok(LocalIdentityReport {
        provider: identity.provider_name().to_string(),
        address: identity.address()?.to_string(),
        commitment: identity.derive_local_commitment()?.to_hex(),
    })
}
