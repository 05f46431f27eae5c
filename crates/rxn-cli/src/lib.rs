//! # rxn-cli: Anonymous Reactions Operator CLI
//!
//! Offline tooling over `rxn-crypto`. Nothing here talks to a running
//! service; every subcommand is a pure computation over its arguments (and,
//! for `local-identity`, one environment variable).
//!
//! ## Subcommands
//!
//! - `commitment`, `local-identity`: member commitments
//! - `tree-root`, `membership-proof`: membership tree over a given set
//! - `reaction-key`, `feed-secret`: HKDF-derived symmetric keys
//! - `feed-keygen`, `decrypt-tally`: feed ElGamal keys and tally decryption
//!
//! ## Crate Policy
//!
//! - Argument parsing lives next to each handler; handlers return an exit
//!   code and print to stdout.
//! - Computation is in plain functions so it can be tested without a
//!   process.

pub mod identity;
pub mod keys;
pub mod tally;
pub mod tree;

use anyhow::{Context, Result};
use rxn_core::Commitment;

/// Parse a hex commitment (optional `0x`).
pub(crate) fn parse_commitment(raw: &str) -> Result<Commitment> {
    Commitment::from_hex(raw).with_context(|| format!("invalid commitment {raw:?}"))
}

/// Print a value as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
