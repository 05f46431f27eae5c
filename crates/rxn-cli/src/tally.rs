//! Tally decryption for feed key holders.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use rxn_core::VoteCiphertext;
use rxn_crypto::curve::scalar_from_bytes;
use rxn_crypto::ElGamalKeypair;

use crate::print_json;

/// `rxn decrypt-tally <secret-key-hex> <tally-json>`
#[derive(Args, Debug)]
pub struct DecryptTallyArgs {
    /// Feed secret scalar, 32 bytes big-endian hex.
    pub secret_key: String,
    /// Tally as JSON (array of `{c1, c2}`), or `@path` to read it from a file.
    pub tally: String,
    /// Largest per-slot count searched for.
    #[arg(long, default_value_t = 10_000)]
    pub max: u64,
}

fn keypair_from_hex(raw: &str) -> Result<ElGamalKeypair> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(hex::decode(digits).context("secret key is not valid hex")?);
    let Ok(array) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("secret key must be 32 bytes, got {}", bytes.len());
    };
    let array = Zeroizing::new(array);
    Ok(ElGamalKeypair::from_secret(scalar_from_bytes(&array)?))
}

fn load_tally(raw: &str) -> Result<VoteCiphertext> {
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("reading tally from {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&json).context("tally is not a valid ciphertext array")
}

/// Per-slot counts; `None` where the count exceeds `max`.
pub fn decrypt_tally(secret_key: &str, tally: &VoteCiphertext, max: u64) -> Result<Vec<Option<u64>>> {
    let keypair = keypair_from_hex(secret_key)?;
    Ok(keypair.decrypt_tally(tally, max)?)
}

pub fn run_decrypt_tally(args: &DecryptTallyArgs) -> Result<u8> {
    let tally = load_tally(&args.tally)?;
    let counts = decrypt_tally(&args.secret_key, &tally, args.max)?;
    if counts.iter().any(Option::is_none) {
        tracing::warn!(max = args.max, "some slots exceed the search bound");
    }
    print_json(&counts)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use rxn_crypto::curve::scalar_to_bytes;
    use rxn_crypto::elgamal::add_votes;
    use rxn_crypto::encrypt_vote;

    #[test]
    fn decrypts_summed_votes() {
        let mut rng = StdRng::seed_from_u64(11);
        let keypair = ElGamalKeypair::generate(&mut rng);
        let pk = keypair.public_key();
        let a = encrypt_vote(&pk, 1, 3, &mut rng).unwrap();
        let b = encrypt_vote(&pk, 1, 3, &mut rng).unwrap();
        let c = encrypt_vote(&pk, 2, 3, &mut rng).unwrap();
        let tally = add_votes(&add_votes(&a, &b).unwrap(), &c).unwrap();

        let json = serde_json::to_string(&tally).unwrap();
        let parsed = load_tally(&json).unwrap();
        let secret = hex::encode(scalar_to_bytes(keypair.secret()));
        let counts = decrypt_tally(&secret, &parsed, 10).unwrap();
        assert_eq!(counts, vec![Some(0), Some(2), Some(1)]);
    }

    #[test]
    fn wrong_length_secret_rejected() {
        assert!(decrypt_tally("abcd", &VoteCiphertext::identity(1), 1).is_err());
    }

    #[test]
    fn garbage_tally_rejected() {
        assert!(load_tally("{\"not\": \"a tally\"}").is_err());
    }
}
