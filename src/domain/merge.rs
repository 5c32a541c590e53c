//! Local-wins merge of remote candidates into the local collection.
//!
//! Pure and deterministic: the same inputs always yield the same merged
//! sequence and report.

use std::collections::HashSet;

use super::models::{Quote, SyncReport};

/// Result of merging a batch of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Existing entries followed by the accepted candidates, in order.
    pub merged: Vec<Quote>,
    /// Counts and conflicts for this merge.
    pub report: SyncReport,
}

/// Merge `incoming` into `existing`.
///
/// Existing entries are never removed or altered. A candidate whose text is
/// already present (in `existing` or earlier in `incoming`) is recorded as a
/// conflict and dropped; every other candidate is appended.
#[must_use]
pub fn merge(existing: &[Quote], incoming: &[Quote]) -> MergeOutcome {
    let mut merged = existing.to_vec();
    let mut seen: HashSet<String> = existing.iter().map(|q| q.text.clone()).collect();
    let mut report = SyncReport::default();

    for candidate in incoming {
        if seen.contains(&candidate.text) {
            report.conflicted_texts.push(candidate.text.clone());
            continue;
        }

        seen.insert(candidate.text.clone());
        merged.push(candidate.clone());
        report.added_count += 1;
    }

    MergeOutcome { merged, report }
}
