//! Membership roots and proofs over an explicit commitment set.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use rxn_core::{Commitment, FieldBytes, MerkleRoot, TREE_DEPTH};
use rxn_crypto::MembershipTree;

use crate::{parse_commitment, print_json};

/// `rxn tree-root <commitment>...`
#[derive(Args, Debug)]
pub struct TreeRootArgs {
    /// Active commitments, hex. Order and duplicates do not matter.
    pub commitments: Vec<String>,
}

/// `rxn membership-proof <target> <commitment>...`
#[derive(Args, Debug)]
pub struct MembershipProofArgs {
    /// Commitment to prove.
    pub target: String,
    /// Active commitments, hex.
    #[arg(required = true)]
    pub commitments: Vec<String>,
}

/// Inclusion proof in the shape the membership service returns.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProofReport {
    pub is_member: bool,
    pub root: Option<MerkleRoot>,
    pub path_elements: Option<Vec<FieldBytes>>,
    pub path_indices: Option<Vec<u8>>,
    pub tree_depth: usize,
}

fn parse_all(raw: &[String]) -> Result<Vec<Commitment>> {
    raw.iter().map(|c| parse_commitment(c)).collect()
}

pub fn tree_root(commitments: &[Commitment]) -> Result<MerkleRoot> {
    Ok(MembershipTree::from_commitments(commitments)?.root())
}

pub fn membership_proof(target: &Commitment, commitments: &[Commitment]) -> Result<ProofReport> {
    let tree = MembershipTree::from_commitments(commitments)?;
    Ok(match tree.proof_for(target) {
        Some(path) => ProofReport {
            is_member: true,
            root: Some(tree.root()),
            path_elements: Some(path.elements),
            path_indices: Some(path.indices),
            tree_depth: TREE_DEPTH,
        },
        None => ProofReport {
            is_member: false,
            root: None,
            path_elements: None,
            path_indices: None,
            tree_depth: TREE_DEPTH,
        },
    })
}

pub fn run_tree_root(args: &TreeRootArgs) -> Result<u8> {
    let commitments = parse_all(&args.commitments)?;
    tracing::debug!(leaves = commitments.len(), "computing root");
    println!("{}", tree_root(&commitments)?);
    Ok(0)
}

pub fn run_membership_proof(args: &MembershipProofArgs) -> Result<u8> {
    let target = parse_commitment(&args.target)?;
    let commitments = parse_all(&args.commitments)?;
    let report = membership_proof(&target, &commitments)?;
    print_json(&report)?;
    Ok(if report.is_member { 0 } else { 2 })
}
