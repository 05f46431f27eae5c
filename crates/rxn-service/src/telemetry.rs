//! Metric names and recording helpers.
//!
//! Only the `metrics` facade is used; hosts install an exporter.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, histogram};

pub const METRIC_SUBMISSIONS: &str = "rxn_reaction_submissions_total";
pub const METRIC_TALLY_CONFLICTS: &str = "rxn_tally_conflicts_total";
pub const METRIC_PROOF_VERIFY_SECONDS: &str = "rxn_proof_verification_seconds";
pub const METRIC_MEMBERSHIP_MUTATIONS: &str = "rxn_membership_mutations_total";
pub const METRIC_EVENTS: &str = "rxn_membership_events_total";

static METRIC_DESCRIPTORS: OnceLock<()> = OnceLock::new();

/// Register descriptions once per process.
pub fn describe() {
    METRIC_DESCRIPTORS.get_or_init(|| {
        metrics::describe_counter!(
            METRIC_SUBMISSIONS,
            "Reaction submissions grouped by outcome (accepted or rejection code)"
        );
        metrics::describe_counter!(
            METRIC_TALLY_CONFLICTS,
            "Tally version conflicts that triggered a retry"
        );
        metrics::describe_histogram!(
            METRIC_PROOF_VERIFY_SECONDS,
            "Wall time of one proof verification call in seconds"
        );
        metrics::describe_counter!(
            METRIC_MEMBERSHIP_MUTATIONS,
            "Membership commitment changes grouped by kind"
        );
        metrics::describe_counter!(
            METRIC_EVENTS,
            "Membership events handled grouped by kind and result"
        );
    });
}

pub(crate) fn submission(outcome: &'static str) {
    counter!(METRIC_SUBMISSIONS, "outcome" => outcome).increment(1);
}

pub(crate) fn tally_conflict() {
    counter!(METRIC_TALLY_CONFLICTS).increment(1);
}

pub(crate) fn proof_verification(elapsed: Duration, valid: bool) {
    let result = if valid { "valid" } else { "invalid" };
    histogram!(METRIC_PROOF_VERIFY_SECONDS, "result" => result).record(elapsed.as_secs_f64());
}

pub(crate) fn membership_mutation(kind: &'static str) {
    counter!(METRIC_MEMBERSHIP_MUTATIONS, "kind" => kind).increment(1);
}

pub(crate) fn membership_event(kind: &'static str, result: &'static str) {
    counter!(METRIC_EVENTS, "kind" => kind, "result" => result).increment(1);
}
