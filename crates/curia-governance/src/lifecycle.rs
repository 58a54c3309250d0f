use crate::error::{GovernanceError, Result};
use crate::tally::tally_final_votes;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use curia_anchor::AnchorService;
use curia_app_common::{best_effort, LifecycleState};
use curia_economics::{AgrLedger, RewardPolicy};
use curia_storage::LedgerStore;
use curia_types::{Address, ChainRef, Job, JobId, JobStatus, SubmissionId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Outbound notification hook. Dispatch is best-effort; implementations live
/// outside this core (the default just logs).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn job_closed(&self, job: &Job, recipients: &[Address]) -> anyhow::Result<()>;
}

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn job_closed(&self, job: &Job, recipients: &[Address]) -> anyhow::Result<()> {
        info!(
            job_id = %job.id,
            recipients = recipients.len(),
            "Job closed notification"
        );
        Ok(())
    }
}

/// Job lifecycle state machine: open → closed, exactly once.
///
/// Two triggers share one closing primitive: the sponsor picking a winner, or
/// anyone finalizing the final-vote tally after its window elapsed.
pub struct JobLifecycle {
    store: Arc<dyn LedgerStore>,
    agr: Arc<AgrLedger>,
    anchors: Arc<AnchorService>,
    notifier: Arc<dyn Notifier>,
    rewards: RewardPolicy,
    default_final_vote_window: Duration,
}

impl JobLifecycle {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        agr: Arc<AgrLedger>,
        anchors: Arc<AnchorService>,
        notifier: Arc<dyn Notifier>,
        rewards: RewardPolicy,
        default_final_vote_window: Duration,
    ) -> Self {
        Self {
            store,
            agr,
            anchors,
            notifier,
            rewards,
            default_final_vote_window,
        }
    }

    /// Sponsor-close: the caller must be the job's sponsor and must name a
    /// winning submission that belongs to the job. Jobs recorded without a
    /// sponsor cannot take this path.
    pub async fn close_by_sponsor(
        &self,
        job_id: &JobId,
        caller: &Address,
        winner_submission_id: &SubmissionId,
        receipt: Option<ChainRef>,
    ) -> Result<Job> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| GovernanceError::JobNotFound(job_id.to_string()))?;

        let sponsor = job
            .sponsor_address
            .as_ref()
            .ok_or(GovernanceError::MissingSponsor)?;
        if sponsor != caller {
            return Err(GovernanceError::NotSponsor);
        }

        let submissions = self.store.list_submissions_for_job(job_id).await?;
        if !submissions.iter().any(|s| &s.id == winner_submission_id) {
            return Err(GovernanceError::WinnerNotFound(
                winner_submission_id.to_string(),
            ));
        }

        self.close(job, winner_submission_id.clone(), receipt, Utc::now())
            .await
    }

    /// Finalize-by-vote at `now`: any caller may trigger it once the
    /// final-vote window has elapsed, provided they cast a final vote
    /// themselves. The winner is the submission with the highest final-vote
    /// count (ties to the lowest submission id).
    pub async fn finalize_by_vote_at(
        &self,
        job_id: &JobId,
        caller: &Address,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| GovernanceError::JobNotFound(job_id.to_string()))?;

        if !job.is_open() {
            return Err(GovernanceError::JobNotOpen(job_id.to_string()));
        }

        let (_, ends_at) = job.final_vote_window(self.default_final_vote_window);
        if now < ends_at {
            return Err(GovernanceError::VotingNotEnded { ends_at });
        }

        if self.store.get_final_vote(job_id, caller).await?.is_none() {
            return Err(GovernanceError::FinalVoteRequired);
        }

        let votes = self.store.list_final_votes_for_job(job_id).await?;
        let tallies = tally_final_votes(&votes);
        let winner = tallies
            .first()
            .map(|t| t.submission_id.clone())
            .ok_or(GovernanceError::NoFinalVotes)?;

        self.close(job, winner, None, now).await
    }

    pub async fn finalize_by_vote(&self, job_id: &JobId, caller: &Address) -> Result<Job> {
        self.finalize_by_vote_at(job_id, caller, Utc::now()).await
    }

    /// Shared closing primitive: flip status, write closure fields, then run
    /// the best-effort side effects. A closed job is immutable afterwards.
    async fn close(
        &self,
        mut job: Job,
        winner_submission_id: SubmissionId,
        receipt: Option<ChainRef>,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        if !job.status.can_transition_to(&JobStatus::Closed) {
            return Err(GovernanceError::InvalidTransition(format!(
                "job {} is already {:?}",
                job.id, job.status
            )));
        }

        job.status = JobStatus::Closed;
        job.winner_submission_id = Some(winner_submission_id.clone());
        job.closed_at = Some(now);
        job.close_receipt = receipt;
        self.store.put_job(&job).await?;

        info!(
            job_id = %job.id,
            winner_submission_id = %winner_submission_id,
            "Job closed"
        );

        self.run_post_close(&job, &winner_submission_id).await;
        Ok(job)
    }

    /// Post-close side effects. Each one is isolated: a failure here is
    /// logged and ignored, the job stays closed either way.
    async fn run_post_close(&self, job: &Job, winner_submission_id: &SubmissionId) {
        let submissions = match self.store.list_submissions_for_job(&job.id).await {
            Ok(subs) => subs,
            Err(_) => Vec::new(),
        };

        let mut recipients: BTreeSet<Address> =
            submissions.iter().map(|s| s.author_address.clone()).collect();
        if let Some(sponsor) = &job.sponsor_address {
            recipients.insert(sponsor.clone());
        }
        let recipients: Vec<Address> = recipients.into_iter().collect();

        best_effort(
            "notify_job_closed",
            self.notifier.job_closed(job, &recipients),
        )
        .await;

        if self.rewards.rewards_enabled {
            if let Some(winner) = submissions
                .iter()
                .find(|s| &s.id == winner_submission_id)
            {
                best_effort(
                    "mint_win_reward",
                    self.agr.mint_win_reward(
                        &job.id,
                        &winner.author_address,
                        self.rewards.agr_mint_per_win,
                    ),
                )
                .await;
            }
        }

        best_effort(
            "create_anchor_batch",
            self.anchors.create_anchor_batch(&job.id),
        )
        .await;
    }
}
