use crate::address::Address;
use crate::id::{JobId, SubmissionId, VoteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weighted jury recommendation. At most one per (job, voter); a revote
/// overwrites the prior record in place, keeping the original row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JuryVote {
    pub id: VoteId,
    pub job_id: JobId,
    pub submission_id: SubmissionId,
    pub voter_address: Address,
    /// Derived from the voter's reputation at cast time, never cached
    /// across revotes.
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl JuryVote {
    pub fn new(
        job_id: JobId,
        submission_id: SubmissionId,
        voter_address: Address,
        weight: f64,
        review: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: VoteId::generate(),
            job_id,
            submission_id,
            voter_address,
            weight,
            review,
            created_at: Utc::now(),
        }
    }
}

/// Unweighted decisive vote, accepted only inside the job's final-vote
/// window. One per (job, voter), same overwrite-in-place semantics as
/// [`JuryVote`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalVote {
    pub id: VoteId,
    pub job_id: JobId,
    pub submission_id: SubmissionId,
    pub voter_address: Address,
    pub created_at: DateTime<Utc>,
}

impl FinalVote {
    pub fn new(job_id: JobId, submission_id: SubmissionId, voter_address: Address) -> Self {
        Self {
            id: VoteId::generate(),
            job_id,
            submission_id,
            voter_address,
            created_at: Utc::now(),
        }
    }
}
