//! # rxn CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rxn_cli::identity::{run_commitment, run_local_identity, CommitmentArgs, LocalIdentityArgs};
use rxn_cli::keys::{
    run_feed_keygen, run_feed_secret, run_reaction_key, FeedKeygenArgs, FeedSecretArgs,
    ReactionKeyArgs,
};
use rxn_cli::tally::{run_decrypt_tally, DecryptTallyArgs};
use rxn_cli::tree::{run_membership_proof, run_tree_root, MembershipProofArgs, TreeRootArgs};

/// Anonymous reactions operator toolchain.
///
/// Derives member commitments, computes membership roots and inclusion
/// proofs, derives per-message and per-feed symmetric keys, and decrypts
/// reaction tallies with a feed secret.
#[derive(Parser, Debug)]
#[command(name = "rxn", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Commitment of a member address.
    Commitment(CommitmentArgs),

    /// Address and commitment of the locally configured member key.
    LocalIdentity(LocalIdentityArgs),

    /// Membership root over a set of commitments.
    TreeRoot(TreeRootArgs),

    /// Inclusion proof of one commitment in a set.
    MembershipProof(MembershipProofArgs),

    /// Per-message reaction key derived from a shared feed key.
    ReactionKey(ReactionKeyArgs),

    /// Per-feed secret derived from a shared feed key.
    FeedSecret(FeedSecretArgs),

    /// Generate a fresh feed ElGamal key pair.
    FeedKeygen(FeedKeygenArgs),

    /// Decrypt a message tally with the feed secret.
    DecryptTally(DecryptTallyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::debug!("rxn CLI starting");

    let result = match cli.command {
        Commands::Commitment(args) => run_commitment(&args),
        Commands::LocalIdentity(args) => run_local_identity(&args),
        Commands::TreeRoot(args) => run_tree_root(&args),
        Commands::MembershipProof(args) => run_membership_proof(&args),
        Commands::ReactionKey(args) => run_reaction_key(&args),
        Commands::FeedSecret(args) => run_feed_secret(&args),
        Commands::FeedKeygen(args) => run_feed_keygen(&args),
        Commands::DecryptTally(args) => run_decrypt_tally(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
