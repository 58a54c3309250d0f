use chrono::{DateTime, Utc};
use curia_storage::LedgerError;
use thiserror::Error;

/// Governance operation result type
pub type Result<T> = std::result::Result<T, GovernanceError>;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job is not open: {0}")]
    JobNotOpen(String),

    #[error("Submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("Submission {submission} does not belong to job {job}")]
    SubmissionJobMismatch { submission: String, job: String },

    #[error("Voting for one's own submission is not allowed")]
    SelfVote,

    #[error("Insufficient stake: required {required}, actual {actual}")]
    InsufficientStake { required: f64, actual: f64 },

    #[error("Insufficient reputation: required {required}, actual {actual}")]
    InsufficientReputation { required: f64, actual: f64 },

    #[error("Final voting has not opened yet (starts at {starts_at})")]
    VotingNotOpen { starts_at: DateTime<Utc> },

    #[error("Final voting window has closed (ended at {ended_at})")]
    VotingClosed { ended_at: DateTime<Utc> },

    #[error("Final voting is still open (ends at {ends_at})")]
    VotingNotEnded { ends_at: DateTime<Utc> },

    #[error("Caller is not the job's sponsor")]
    NotSponsor,

    #[error("Job has no sponsor on record; it cannot be sponsor-closed")]
    MissingSponsor,

    #[error("Caller must cast a final vote before finalizing")]
    FinalVoteRequired,

    #[error("No final votes were cast for this job")]
    NoFinalVotes,

    #[error("Winner submission not found for job: {0}")]
    WinnerNotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
