use crate::address::Address;
use crate::id::{JobId, SubmissionId};
use crate::onchain::ChainRef;
use chrono::{DateTime, Duration, Utc};
use curia_app_common::LifecycleState;
use serde::{Deserialize, Serialize};

/// Job lifecycle status. `Closed` is terminal: closed jobs are immutable
/// except for anchor-receipt attachment on their anchor batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
}

impl LifecycleState for JobStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        matches!((self, next), (Self::Open, Self::Closed))
    }
}

/// A bounty job: participants submit work, a jury recommends, and either the
/// sponsor or a time-boxed final vote picks the winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub prompt: String,
    pub bounty_usdc: f64,
    pub sponsor_address: Option<Address>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,

    pub winner_submission_id: Option<SubmissionId>,
    pub closed_at: Option<DateTime<Utc>>,

    /// On-chain receipt for the close transaction, when the sponsor settled
    /// the bounty on-chain.
    pub close_receipt: Option<ChainRef>,

    /// Final-decision voting window. Jobs created before windows existed
    /// carry `None` and fall back to a configured default span.
    pub final_vote_starts_at: Option<DateTime<Utc>>,
    pub final_vote_ends_at: Option<DateTime<Utc>>,

    /// Discovery boost paid in AGR. The score only ever increases.
    pub featured_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub featured_score: i64,
}

impl Job {
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
        bounty_usdc: f64,
        sponsor_address: Option<Address>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: JobId::generate(),
            title: title.into(),
            prompt: prompt.into(),
            bounty_usdc,
            sponsor_address,
            tags,
            status: JobStatus::Open,
            created_at: Utc::now(),
            winner_submission_id: None,
            closed_at: None,
            close_receipt: None,
            final_vote_starts_at: None,
            final_vote_ends_at: None,
            featured_until: None,
            featured_score: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == JobStatus::Open
    }

    /// Effective final-vote window. Explicit endpoints win; legacy jobs
    /// without them vote within `default_window` of creation.
    pub fn final_vote_window(&self, default_window: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        let starts = self.final_vote_starts_at.unwrap_or(self.created_at);
        let ends = self
            .final_vote_ends_at
            .unwrap_or(self.created_at + default_window);
        (starts, ends)
    }
}
