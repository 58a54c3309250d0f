use curia_types::{FinalVote, JuryVote, SubmissionId};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Jury vote weight from a reputation score: `1 + ⌊√max(0, R)⌋`, clamped to
/// `[1, 5]`. Deterministic, monotonic, never below one.
pub fn vote_weight(rep_score: f64) -> f64 {
    let base = 1.0 + rep_score.max(0.0).sqrt().floor();
    base.clamp(1.0, 5.0)
}

/// Aggregated votes for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteTally {
    pub submission_id: SubmissionId,
    pub weighted_votes: f64,
    pub voters: u32,
}

/// Tally jury votes per submission, ranked by descending weight.
///
/// Ties resolve to the lexicographically smallest submission id, so the
/// ranking is identical across storage backends.
pub fn tally_jury_votes(votes: &[JuryVote]) -> Vec<VoteTally> {
    let mut acc: BTreeMap<SubmissionId, (f64, u32)> = BTreeMap::new();
    for vote in votes {
        let entry = acc.entry(vote.submission_id.clone()).or_insert((0.0, 0));
        entry.0 += vote.weight;
        entry.1 += 1;
    }
    ranked(acc)
}

/// Tally final votes per submission: one person, one vote. Same ranking and
/// tie-break rule as [`tally_jury_votes`].
pub fn tally_final_votes(votes: &[FinalVote]) -> Vec<VoteTally> {
    let mut acc: BTreeMap<SubmissionId, (f64, u32)> = BTreeMap::new();
    for vote in votes {
        let entry = acc.entry(vote.submission_id.clone()).or_insert((0.0, 0));
        entry.0 += 1.0;
        entry.1 += 1;
    }
    ranked(acc)
}

fn ranked(acc: BTreeMap<SubmissionId, (f64, u32)>) -> Vec<VoteTally> {
    let mut tallies: Vec<VoteTally> = acc
        .into_iter()
        .map(|(submission_id, (weighted_votes, voters))| VoteTally {
            submission_id,
            weighted_votes,
            voters,
        })
        .collect();

    tallies.sort_by(|a, b| {
        b.weighted_votes
            .partial_cmp(&a.weighted_votes)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });
    tallies
}
