use crate::error::{GovernanceError, Result};
use crate::tally::vote_weight;
use chrono::{DateTime, Duration, Utc};
use curia_storage::LedgerStore;
use curia_types::{
    Address, Evidence, FinalVote, Job, JobId, JuryVote, ReputationRecord, Submission, SubmissionId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Eligibility gates and window defaults for voting.
#[derive(Debug, Clone)]
pub struct VotingConfig {
    /// Minimum staked collateral for paid participation (submitting, jury
    /// voting).
    pub min_stake_usdc: f64,
    /// Minimum reputation score required to sit on a jury.
    pub min_rep_score_to_vote: f64,
    /// Final-vote window span for jobs created without explicit endpoints.
    pub default_final_vote_window: Duration,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            min_stake_usdc: 10.0,
            min_rep_score_to_vote: 10.0,
            default_final_vote_window: Duration::hours(72),
        }
    }
}

/// Request-scoped submission and vote casting against the shared ledger.
pub struct VotingService {
    store: Arc<dyn LedgerStore>,
    config: VotingConfig,
}

impl VotingService {
    pub fn new(store: Arc<dyn LedgerStore>, config: VotingConfig) -> Self {
        Self { store, config }
    }

    async fn staked_amount(&self, address: &Address) -> Result<f64> {
        Ok(self
            .store
            .get_stake(address)
            .await?
            .map(|s| s.amount_usdc)
            .unwrap_or(0.0))
    }

    async fn reputation_score(&self, address: &Address) -> Result<f64> {
        Ok(self
            .store
            .get_reputation(address)
            .await?
            .map(|r| r.score)
            .unwrap_or(0.0))
    }

    async fn open_job(&self, job_id: &JobId) -> Result<Job> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| GovernanceError::JobNotFound(job_id.to_string()))?;
        if !job.is_open() {
            return Err(GovernanceError::JobNotOpen(job_id.to_string()));
        }
        Ok(job)
    }

    /// The submission must exist, belong to the job, and not be the voter's
    /// own work.
    async fn votable_submission(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        voter: &Address,
    ) -> Result<Submission> {
        let submission = self
            .store
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| GovernanceError::SubmissionNotFound(submission_id.to_string()))?;

        if &submission.job_id != job_id {
            return Err(GovernanceError::SubmissionJobMismatch {
                submission: submission_id.to_string(),
                job: job_id.to_string(),
            });
        }

        if &submission.author_address == voter {
            return Err(GovernanceError::SelfVote);
        }

        Ok(submission)
    }

    /// Submit work against an open job. Requires the participation stake;
    /// every accepted submission bumps the author's reputation.
    pub async fn create_submission(
        &self,
        job_id: &JobId,
        author: &Address,
        content: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Result<Submission> {
        self.open_job(job_id).await?;

        let staked = self.staked_amount(author).await?;
        if staked < self.config.min_stake_usdc {
            return Err(GovernanceError::InsufficientStake {
                required: self.config.min_stake_usdc,
                actual: staked,
            });
        }

        let submission = Submission::new(job_id.clone(), author.clone(), content, evidence);
        self.store.put_submission(&submission).await?;

        let mut rep = self
            .store
            .get_reputation(author)
            .await?
            .unwrap_or_else(|| ReputationRecord::new(author.clone()));
        rep.bump(1.0);
        self.store.put_reputation(&rep).await?;

        info!(
            job_id = %job_id,
            submission_id = %submission.id,
            author = %author,
            "Submission created"
        );
        Ok(submission)
    }

    /// Cast (or replace) a jury recommendation vote.
    ///
    /// Weight is recomputed from the voter's current reputation at cast time,
    /// never carried over from a prior vote.
    pub async fn cast_jury_vote(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        voter: &Address,
        review: Option<serde_json::Value>,
    ) -> Result<JuryVote> {
        self.open_job(job_id).await?;
        self.votable_submission(job_id, submission_id, voter).await?;

        let staked = self.staked_amount(voter).await?;
        if staked < self.config.min_stake_usdc {
            return Err(GovernanceError::InsufficientStake {
                required: self.config.min_stake_usdc,
                actual: staked,
            });
        }

        let rep_score = self.reputation_score(voter).await?;
        if rep_score < self.config.min_rep_score_to_vote {
            return Err(GovernanceError::InsufficientReputation {
                required: self.config.min_rep_score_to_vote,
                actual: rep_score,
            });
        }

        let weight = vote_weight(rep_score);
        let vote = JuryVote::new(
            job_id.clone(),
            submission_id.clone(),
            voter.clone(),
            weight,
            review,
        );
        let stored = self.store.upsert_jury_vote(&vote).await?;

        debug!(
            job_id = %job_id,
            voter = %voter,
            submission_id = %submission_id,
            weight = weight,
            "Jury vote recorded"
        );
        Ok(stored)
    }

    /// Cast (or replace) a final decisive vote at `now`. Accepted only inside
    /// the job's final-vote window.
    pub async fn cast_final_vote_at(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        voter: &Address,
        now: DateTime<Utc>,
    ) -> Result<FinalVote> {
        let job = self.open_job(job_id).await?;
        self.votable_submission(job_id, submission_id, voter).await?;

        let (starts_at, ends_at) = job.final_vote_window(self.config.default_final_vote_window);
        if now < starts_at {
            return Err(GovernanceError::VotingNotOpen { starts_at });
        }
        if now > ends_at {
            return Err(GovernanceError::VotingClosed { ended_at: ends_at });
        }

        let vote = FinalVote::new(job_id.clone(), submission_id.clone(), voter.clone());
        let stored = self.store.upsert_final_vote(&vote).await?;

        debug!(
            job_id = %job_id,
            voter = %voter,
            submission_id = %submission_id,
            "Final vote recorded"
        );
        Ok(stored)
    }

    pub async fn cast_final_vote(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        voter: &Address,
    ) -> Result<FinalVote> {
        self.cast_final_vote_at(job_id, submission_id, voter, Utc::now())
            .await
    }
}
