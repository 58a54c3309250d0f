use crate::backend::{LedgerError, LedgerStore, Result};
use async_trait::async_trait;
use curia_types::{
    Address, AgrLedgerEntry, AnchorBatch, ChainRef, Comment, CommentTarget, DonationEvent,
    DonorTotal, FinalVote, Job, JobId, JobStatus, JuryVote, ProfileRecord, ReputationRecord,
    SlashingEvent, StakeRecord, Submission, SubmissionId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory ledger backend for tests, development, and deployments without
/// a configured durable database.
///
/// One typed map per entity; a single lock keeps multi-table writes atomic.
#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    submissions: HashMap<SubmissionId, Submission>,
    jury_votes: HashMap<(JobId, Address), JuryVote>,
    final_votes: HashMap<(JobId, Address), FinalVote>,
    stakes: HashMap<Address, StakeRecord>,
    slashes: HashMap<String, SlashingEvent>,
    donations: HashMap<String, DonationEvent>,
    donor_totals: HashMap<Address, DonorTotal>,
    agr_entries: Vec<AgrLedgerEntry>,
    anchors: HashMap<JobId, AnchorBatch>,
    cursors: HashMap<String, u64>,
    reputation: HashMap<Address, ReputationRecord>,
    comments: Vec<Comment>,
    profiles: HashMap<Address, ProfileRecord>,
}

pub struct MemoryBackend {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryBackend {
    async fn put_job(&self, job: &Job) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.get(id).cloned())
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Open)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn put_submission(&self, submission: &Submission) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.get(id).cloned())
    }

    async fn list_submissions_for_job(&self, job_id: &JobId) -> Result<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut subs: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| &s.job_id == job_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(subs)
    }

    async fn upsert_jury_vote(&self, vote: &JuryVote) -> Result<JuryVote> {
        let mut tables = self.tables.write().await;
        let key = (vote.job_id.clone(), vote.voter_address.clone());

        let mut stored = vote.clone();
        if let Some(existing) = tables.jury_votes.get(&key) {
            stored.id = existing.id.clone();
        }
        tables.jury_votes.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list_jury_votes_for_job(&self, job_id: &JobId) -> Result<Vec<JuryVote>> {
        let tables = self.tables.read().await;
        let mut votes: Vec<JuryVote> = tables
            .jury_votes
            .values()
            .filter(|v| &v.job_id == job_id)
            .cloned()
            .collect();
        votes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(votes)
    }

    async fn upsert_final_vote(&self, vote: &FinalVote) -> Result<FinalVote> {
        let mut tables = self.tables.write().await;
        let key = (vote.job_id.clone(), vote.voter_address.clone());

        let mut stored = vote.clone();
        if let Some(existing) = tables.final_votes.get(&key) {
            stored.id = existing.id.clone();
        }
        tables.final_votes.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_final_vote(&self, job_id: &JobId, voter: &Address) -> Result<Option<FinalVote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .final_votes
            .get(&(job_id.clone(), voter.clone()))
            .cloned())
    }

    async fn list_final_votes_for_job(&self, job_id: &JobId) -> Result<Vec<FinalVote>> {
        let tables = self.tables.read().await;
        let mut votes: Vec<FinalVote> = tables
            .final_votes
            .values()
            .filter(|v| &v.job_id == job_id)
            .cloned()
            .collect();
        votes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(votes)
    }

    async fn set_stake(&self, record: &StakeRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.stakes.insert(record.address.clone(), record.clone());
        Ok(())
    }

    async fn get_stake(&self, address: &Address) -> Result<Option<StakeRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.stakes.get(address).cloned())
    }

    async fn insert_slashing_event(&self, event: &SlashingEvent) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.slashes.contains_key(event.id.as_str()) {
            return Ok(false);
        }
        tables
            .slashes
            .insert(event.id.as_str().to_string(), event.clone());
        Ok(true)
    }

    async fn list_slashing_events_for_agent(&self, agent: &Address) -> Result<Vec<SlashingEvent>> {
        let tables = self.tables.read().await;
        let mut events: Vec<SlashingEvent> = tables
            .slashes
            .values()
            .filter(|e| &e.agent_address == agent)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn insert_donation_event(&self, event: &DonationEvent) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.donations.contains_key(event.id.as_str()) {
            return Ok(false);
        }
        tables
            .donations
            .insert(event.id.as_str().to_string(), event.clone());
        Ok(true)
    }

    async fn get_donor_total(&self, donor: &Address) -> Result<Option<DonorTotal>> {
        let tables = self.tables.read().await;
        Ok(tables.donor_totals.get(donor).cloned())
    }

    async fn put_donor_total(&self, total: &DonorTotal) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .donor_totals
            .insert(total.donor_address.clone(), total.clone());
        Ok(())
    }

    async fn append_agr_entry(&self, entry: &AgrLedgerEntry) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.agr_entries.push(entry.clone());
        Ok(())
    }

    async fn append_agr_entry_with_job(&self, entry: &AgrLedgerEntry, job: &Job) -> Result<()> {
        // Single lock acquisition: both writes are visible together or not
        // at all.
        let mut tables = self.tables.write().await;
        tables.agr_entries.push(entry.clone());
        tables.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn list_agr_entries(&self, address: &Address) -> Result<Vec<AgrLedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .agr_entries
            .iter()
            .filter(|e| &e.address == address)
            .cloned()
            .collect())
    }

    async fn find_agr_entry_for_job(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<Option<AgrLedgerEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .agr_entries
            .iter()
            .find(|e| e.job_id.as_ref() == Some(job_id) && e.reason == reason)
            .cloned())
    }

    async fn insert_anchor_batch(&self, batch: &AnchorBatch) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.anchors.contains_key(&batch.job_id) {
            return Ok(false);
        }
        tables.anchors.insert(batch.job_id.clone(), batch.clone());
        Ok(true)
    }

    async fn get_anchor_batch(&self, job_id: &JobId) -> Result<Option<AnchorBatch>> {
        let tables = self.tables.read().await;
        Ok(tables.anchors.get(job_id).cloned())
    }

    async fn set_anchor_receipt(&self, job_id: &JobId, receipt: &ChainRef) -> Result<AnchorBatch> {
        let mut tables = self.tables.write().await;
        let batch = tables
            .anchors
            .get_mut(job_id)
            .ok_or_else(|| LedgerError::NotFound(format!("anchor batch for job {}", job_id)))?;
        batch.receipt = Some(receipt.clone());
        Ok(batch.clone())
    }

    async fn get_cursor(&self, key: &str) -> Result<Option<u64>> {
        let tables = self.tables.read().await;
        Ok(tables.cursors.get(key).copied())
    }

    async fn set_cursor(&self, key: &str, next_block: u64) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.cursors.insert(key.to_string(), next_block);
        Ok(())
    }

    async fn get_reputation(&self, address: &Address) -> Result<Option<ReputationRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.reputation.get(address).cloned())
    }

    async fn put_reputation(&self, record: &ReputationRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .reputation
            .insert(record.address.clone(), record.clone());
        Ok(())
    }

    async fn put_comment(&self, comment: &Comment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.comments.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, target: CommentTarget, target_id: &str) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.target == target && c.target_id == target_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn get_profile(&self, address: &Address) -> Result<Option<ProfileRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(address).cloned())
    }

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .profiles
            .insert(profile.address.clone(), profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jury_vote_upsert_keeps_row_id() {
        let backend = MemoryBackend::new();
        let job = JobId::new("j1");
        let voter = Address::new("0xv1");

        let first = JuryVote::new(
            job.clone(),
            SubmissionId::new("s1"),
            voter.clone(),
            2.0,
            None,
        );
        let stored = backend.upsert_jury_vote(&first).await.unwrap();

        let revote = JuryVote::new(
            job.clone(),
            SubmissionId::new("s2"),
            voter.clone(),
            3.0,
            None,
        );
        let stored2 = backend.upsert_jury_vote(&revote).await.unwrap();

        assert_eq!(stored.id, stored2.id);
        assert_eq!(stored2.submission_id, SubmissionId::new("s2"));

        let votes = backend.list_jury_votes_for_job(&job).await.unwrap();
        assert_eq!(votes.len(), 1);
    }

    #[tokio::test]
    async fn test_slashing_insert_is_idempotent() {
        let backend = MemoryBackend::new();
        let event = SlashingEvent {
            id: curia_types::event_id(8453, "0xdead", 3),
            agent_address: Address::new("0xa"),
            amount_usdc: 5.0,
            recipient_address: None,
            job_id: None,
            receipt: None,
            created_at: chrono::Utc::now(),
        };

        assert!(backend.insert_slashing_event(&event).await.unwrap());
        assert!(!backend.insert_slashing_event(&event).await.unwrap());

        let events = backend
            .list_slashing_events_for_agent(&Address::new("0xa"))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_anchor_batch_unique_per_job() {
        let backend = MemoryBackend::new();
        let job = JobId::new("j1");

        let batch = AnchorBatch::new(
            job.clone(),
            1,
            "0xsalt".to_string(),
            "0xroot".to_string(),
            "mem://a".to_string(),
        );
        assert!(backend.insert_anchor_batch(&batch).await.unwrap());

        let second = AnchorBatch::new(
            job.clone(),
            1,
            "0xother".to_string(),
            "0xother".to_string(),
            "mem://b".to_string(),
        );
        assert!(!backend.insert_anchor_batch(&second).await.unwrap());

        let stored = backend.get_anchor_batch(&job).await.unwrap().unwrap();
        assert_eq!(stored.anchor_root, "0xroot");
    }
}
