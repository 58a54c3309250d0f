use chrono::{DateTime, SecondsFormat, Utc};
use curia_types::{Comment, FinalVote, Job, JuryVote, Submission};
use serde::Serialize;
use std::collections::BTreeMap;

/// Discussion threads folded into a snapshot: the job's own thread plus one
/// per submission, keyed by submission id.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotComments {
    pub job: Vec<Comment>,
    pub submissions: BTreeMap<String, Vec<Comment>>,
}

/// A job's full history at closure time. Canonical bytes of this document
/// are what the anchor root commits to; every nested collection is fetched
/// in full, no pagination.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub schema_version: u32,
    pub generated_at: String,
    pub job: Job,
    pub submissions: Vec<Submission>,
    pub jury_votes: Vec<JuryVote>,
    pub final_votes: Vec<FinalVote>,
    pub comments: SnapshotComments,
}

impl JobSnapshot {
    pub fn generated_at_string(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
