use async_trait::async_trait;
use curia_types::{
    Address, AgrLedgerEntry, AnchorBatch, ChainRef, Comment, CommentTarget, DonationEvent,
    DonorTotal, FinalVote, Job, JobId, JuryVote, ProfileRecord, ReputationRecord, SlashingEvent,
    StakeRecord, Submission, SubmissionId,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Durable ledger operations, one typed table per entity.
///
/// Uniqueness keys are the concurrency-control mechanism: (job, voter) for
/// votes, one anchor batch per job, deterministic `chain:tx:logIndex` ids for
/// on-chain facts. Racing writers resolve to "first creates, later writers
/// update in place or no-op" — never duplicate rows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ---- Jobs ----

    /// Insert or replace a job row.
    async fn put_job(&self, job: &Job) -> Result<()>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;

    /// Open jobs, newest first.
    async fn list_open_jobs(&self) -> Result<Vec<Job>>;

    // ---- Submissions ----

    async fn put_submission(&self, submission: &Submission) -> Result<()>;

    async fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>>;

    /// A job's submissions, oldest first.
    async fn list_submissions_for_job(&self, job_id: &JobId) -> Result<Vec<Submission>>;

    // ---- Jury votes ----

    /// Upsert by (job, voter). A revote keeps the existing row id and
    /// replaces everything else. Returns the stored row.
    async fn upsert_jury_vote(&self, vote: &JuryVote) -> Result<JuryVote>;

    async fn list_jury_votes_for_job(&self, job_id: &JobId) -> Result<Vec<JuryVote>>;

    // ---- Final votes ----

    /// Same upsert semantics as [`Self::upsert_jury_vote`].
    async fn upsert_final_vote(&self, vote: &FinalVote) -> Result<FinalVote>;

    async fn get_final_vote(&self, job_id: &JobId, voter: &Address) -> Result<Option<FinalVote>>;

    async fn list_final_votes_for_job(&self, job_id: &JobId) -> Result<Vec<FinalVote>>;

    // ---- Stake ----

    async fn set_stake(&self, record: &StakeRecord) -> Result<()>;

    async fn get_stake(&self, address: &Address) -> Result<Option<StakeRecord>>;

    // ---- Slashing ----

    /// Idempotent insert. Returns `false` without touching the row when the
    /// id already exists.
    async fn insert_slashing_event(&self, event: &SlashingEvent) -> Result<bool>;

    async fn list_slashing_events_for_agent(&self, agent: &Address) -> Result<Vec<SlashingEvent>>;

    // ---- Donations ----

    /// Idempotent insert keyed by the deterministic event id.
    async fn insert_donation_event(&self, event: &DonationEvent) -> Result<bool>;

    async fn get_donor_total(&self, donor: &Address) -> Result<Option<DonorTotal>>;

    async fn put_donor_total(&self, total: &DonorTotal) -> Result<()>;

    // ---- AGR ledger ----

    async fn append_agr_entry(&self, entry: &AgrLedgerEntry) -> Result<()>;

    /// Atomically append a ledger entry and rewrite a job row. Both writes
    /// land or neither does; this backs the featured-boost spend.
    async fn append_agr_entry_with_job(&self, entry: &AgrLedgerEntry, job: &Job) -> Result<()>;

    /// An address's entries, oldest first.
    async fn list_agr_entries(&self, address: &Address) -> Result<Vec<AgrLedgerEntry>>;

    /// Any entry with the given reason tag tied to the job, if one exists.
    /// Backs the double-mint guard on win rewards.
    async fn find_agr_entry_for_job(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<Option<AgrLedgerEntry>>;

    // ---- Anchor batches ----

    /// Create-if-absent: returns `false` and leaves the existing row
    /// untouched when the job already has a batch.
    async fn insert_anchor_batch(&self, batch: &AnchorBatch) -> Result<bool>;

    async fn get_anchor_batch(&self, job_id: &JobId) -> Result<Option<AnchorBatch>>;

    /// Attach an on-chain receipt to an existing batch. Errors with
    /// [`LedgerError::NotFound`] when the job has no batch yet.
    async fn set_anchor_receipt(&self, job_id: &JobId, receipt: &ChainRef) -> Result<AnchorBatch>;

    // ---- On-chain cursors ----

    async fn get_cursor(&self, key: &str) -> Result<Option<u64>>;

    async fn set_cursor(&self, key: &str, next_block: u64) -> Result<()>;

    // ---- Reputation ----

    async fn get_reputation(&self, address: &Address) -> Result<Option<ReputationRecord>>;

    async fn put_reputation(&self, record: &ReputationRecord) -> Result<()>;

    // ---- Comments ----

    async fn put_comment(&self, comment: &Comment) -> Result<()>;

    /// Comments on a target, oldest first.
    async fn list_comments(&self, target: CommentTarget, target_id: &str) -> Result<Vec<Comment>>;

    // ---- Profiles ----

    async fn get_profile(&self, address: &Address) -> Result<Option<ProfileRecord>>;

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<()>;
}
