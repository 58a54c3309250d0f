use crate::backend::{LedgerError, LedgerStore, Result};
use async_trait::async_trait;
use curia_types::{
    Address, AgrLedgerEntry, AnchorBatch, ChainRef, Comment, CommentTarget, DonationEvent,
    DonorTotal, FinalVote, Job, JobId, JobStatus, JuryVote, ProfileRecord, ReputationRecord,
    SlashingEvent, StakeRecord, Submission, SubmissionId,
};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// RocksDB-backed ledger. Values are JSON-encoded; related rows share a key
/// prefix so job-scoped reads are single prefix scans.
pub struct RocksBackend {
    db: Arc<DB>,
    /// Serializes check-then-write sequences (idempotent inserts, receipt
    /// attachment) that need read-modify-write atomicity.
    write_lock: Mutex<()>,
}

impl RocksBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)
            .map_err(|e| LedgerError::BackendError(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn job_key(id: &JobId) -> Vec<u8> {
        format!("job:{}", id).into_bytes()
    }

    fn submission_key(id: &SubmissionId) -> Vec<u8> {
        format!("sub:{}", id).into_bytes()
    }

    fn submission_index_key(job: &JobId, sub: &SubmissionId) -> Vec<u8> {
        format!("subjob:{}:{}", job, sub).into_bytes()
    }

    fn jury_vote_key(job: &JobId, voter: &Address) -> Vec<u8> {
        format!("jvote:{}:{}", job, voter).into_bytes()
    }

    fn final_vote_key(job: &JobId, voter: &Address) -> Vec<u8> {
        format!("fvote:{}:{}", job, voter).into_bytes()
    }

    fn stake_key(address: &Address) -> Vec<u8> {
        format!("stake:{}", address).into_bytes()
    }

    fn slash_key(id: &str) -> Vec<u8> {
        format!("slash:{}", id).into_bytes()
    }

    fn slash_index_key(agent: &Address, id: &str) -> Vec<u8> {
        format!("slashagent:{}:{}", agent, id).into_bytes()
    }

    fn donation_key(id: &str) -> Vec<u8> {
        format!("don:{}", id).into_bytes()
    }

    fn donor_total_key(donor: &Address) -> Vec<u8> {
        format!("donor:{}", donor).into_bytes()
    }

    fn agr_key(id: &str) -> Vec<u8> {
        format!("agr:{}", id).into_bytes()
    }

    fn agr_addr_index_key(address: &Address, id: &str) -> Vec<u8> {
        format!("agraddr:{}:{}", address, id).into_bytes()
    }

    fn agr_job_index_key(job: &JobId, reason: &str, id: &str) -> Vec<u8> {
        format!("agrjob:{}:{}:{}", job, reason, id).into_bytes()
    }

    fn anchor_key(job: &JobId) -> Vec<u8> {
        format!("anchor:{}", job).into_bytes()
    }

    fn cursor_storage_key(key: &str) -> Vec<u8> {
        format!("cursor:{}", key).into_bytes()
    }

    fn reputation_key(address: &Address) -> Vec<u8> {
        format!("rep:{}", address).into_bytes()
    }

    fn comment_key(target: CommentTarget, target_id: &str, id: &str) -> Vec<u8> {
        let tag = match target {
            CommentTarget::Job => "job",
            CommentTarget::Submission => "submission",
        };
        format!("comment:{}:{}:{}", tag, target_id, id).into_bytes()
    }

    fn profile_key(address: &Address) -> Vec<u8> {
        format!("profile:{}", address).into_bytes()
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| LedgerError::SerializationError(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::SerializationError(e.to_string()))
    }

    fn put_raw(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB put error: {}", e)))
    }

    fn get_raw(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB get error: {}", e)))
    }

    fn get_value<T: DeserializeOwned>(&self, key: Vec<u8>) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_value<T: Serialize>(&self, key: Vec<u8>, value: &T) -> Result<()> {
        self.put_raw(key, Self::encode(value)?)
    }

    /// All values under a key prefix, in key order.
    fn scan_prefix_values<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let mut values = Vec::new();

        for item in iter {
            let (key, value) =
                item.map_err(|e| LedgerError::BackendError(format!("Iterator error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(Self::decode(&value)?);
        }

        Ok(values)
    }

    /// All value bytes under a prefix, undecoded (index markers).
    fn scan_prefix_raw(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let mut values = Vec::new();

        for item in iter {
            let (key, value) =
                item.map_err(|e| LedgerError::BackendError(format!("Iterator error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(value.to_vec());
        }

        Ok(values)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| LedgerError::BackendError(format!("RocksDB batch write error: {}", e)))
    }
}

#[async_trait]
impl LedgerStore for RocksBackend {
    async fn put_job(&self, job: &Job) -> Result<()> {
        self.put_value(Self::job_key(&job.id), job)
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        self.get_value(Self::job_key(id))
    }

    async fn list_open_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .scan_prefix_values::<Job>(b"job:")?
            .into_iter()
            .filter(|j| j.status == JobStatus::Open)
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn put_submission(&self, submission: &Submission) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put(
            Self::submission_key(&submission.id),
            Self::encode(submission)?,
        );
        batch.put(
            Self::submission_index_key(&submission.job_id, &submission.id),
            submission.id.as_str().as_bytes(),
        );
        self.write_batch(batch)
    }

    async fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>> {
        self.get_value(Self::submission_key(id))
    }

    async fn list_submissions_for_job(&self, job_id: &JobId) -> Result<Vec<Submission>> {
        let prefix = format!("subjob:{}:", job_id).into_bytes();
        let mut subs = Vec::new();

        for id_bytes in self.scan_prefix_raw(&prefix)? {
            let id = SubmissionId::new(String::from_utf8_lossy(&id_bytes).to_string());
            if let Some(sub) = self.get_value::<Submission>(Self::submission_key(&id))? {
                subs.push(sub);
            }
        }

        subs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(subs)
    }

    async fn upsert_jury_vote(&self, vote: &JuryVote) -> Result<JuryVote> {
        let _guard = self.write_lock.lock().await;
        let key = Self::jury_vote_key(&vote.job_id, &vote.voter_address);

        let mut stored = vote.clone();
        if let Some(existing) = self.get_value::<JuryVote>(key.clone())? {
            stored.id = existing.id;
        }
        self.put_value(key, &stored)?;
        Ok(stored)
    }

    async fn list_jury_votes_for_job(&self, job_id: &JobId) -> Result<Vec<JuryVote>> {
        let prefix = format!("jvote:{}:", job_id).into_bytes();
        let mut votes = self.scan_prefix_values::<JuryVote>(&prefix)?;
        votes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(votes)
    }

    async fn upsert_final_vote(&self, vote: &FinalVote) -> Result<FinalVote> {
        let _guard = self.write_lock.lock().await;
        let key = Self::final_vote_key(&vote.job_id, &vote.voter_address);

        let mut stored = vote.clone();
        if let Some(existing) = self.get_value::<FinalVote>(key.clone())? {
            stored.id = existing.id;
        }
        self.put_value(key, &stored)?;
        Ok(stored)
    }

    async fn get_final_vote(&self, job_id: &JobId, voter: &Address) -> Result<Option<FinalVote>> {
        self.get_value(Self::final_vote_key(job_id, voter))
    }

    async fn list_final_votes_for_job(&self, job_id: &JobId) -> Result<Vec<FinalVote>> {
        let prefix = format!("fvote:{}:", job_id).into_bytes();
        let mut votes = self.scan_prefix_values::<FinalVote>(&prefix)?;
        votes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(votes)
    }

    async fn set_stake(&self, record: &StakeRecord) -> Result<()> {
        self.put_value(Self::stake_key(&record.address), record)
    }

    async fn get_stake(&self, address: &Address) -> Result<Option<StakeRecord>> {
        self.get_value(Self::stake_key(address))
    }

    async fn insert_slashing_event(&self, event: &SlashingEvent) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = Self::slash_key(event.id.as_str());

        if self.get_raw(key.clone())?.is_some() {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        batch.put(key, Self::encode(event)?);
        batch.put(
            Self::slash_index_key(&event.agent_address, event.id.as_str()),
            Self::encode(event)?,
        );
        self.write_batch(batch)?;
        Ok(true)
    }

    async fn list_slashing_events_for_agent(&self, agent: &Address) -> Result<Vec<SlashingEvent>> {
        let prefix = format!("slashagent:{}:", agent).into_bytes();
        let mut events = self.scan_prefix_values::<SlashingEvent>(&prefix)?;
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    async fn insert_donation_event(&self, event: &DonationEvent) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = Self::donation_key(event.id.as_str());

        if self.get_raw(key.clone())?.is_some() {
            return Ok(false);
        }
        self.put_value(key, event)?;
        Ok(true)
    }

    async fn get_donor_total(&self, donor: &Address) -> Result<Option<DonorTotal>> {
        self.get_value(Self::donor_total_key(donor))
    }

    async fn put_donor_total(&self, total: &DonorTotal) -> Result<()> {
        self.put_value(Self::donor_total_key(&total.donor_address), total)
    }

    async fn append_agr_entry(&self, entry: &AgrLedgerEntry) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_agr_entry(&mut batch, entry)?;
        self.write_batch(batch)
    }

    async fn append_agr_entry_with_job(&self, entry: &AgrLedgerEntry, job: &Job) -> Result<()> {
        // One WriteBatch: ledger debit and job update commit together.
        let mut batch = WriteBatch::default();
        self.stage_agr_entry(&mut batch, entry)?;
        batch.put(Self::job_key(&job.id), Self::encode(job)?);
        self.write_batch(batch)
    }

    async fn list_agr_entries(&self, address: &Address) -> Result<Vec<AgrLedgerEntry>> {
        let prefix = format!("agraddr:{}:", address).into_bytes();
        let mut entries = Vec::new();

        for id_bytes in self.scan_prefix_raw(&prefix)? {
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(entry) = self.get_value::<AgrLedgerEntry>(Self::agr_key(&id))? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    async fn find_agr_entry_for_job(
        &self,
        job_id: &JobId,
        reason: &str,
    ) -> Result<Option<AgrLedgerEntry>> {
        let prefix = format!("agrjob:{}:{}:", job_id, reason).into_bytes();

        for id_bytes in self.scan_prefix_raw(&prefix)? {
            let id = String::from_utf8_lossy(&id_bytes).to_string();
            if let Some(entry) = self.get_value::<AgrLedgerEntry>(Self::agr_key(&id))? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn insert_anchor_batch(&self, batch: &AnchorBatch) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = Self::anchor_key(&batch.job_id);

        if self.get_raw(key.clone())?.is_some() {
            return Ok(false);
        }
        self.put_value(key, batch)?;
        Ok(true)
    }

    async fn get_anchor_batch(&self, job_id: &JobId) -> Result<Option<AnchorBatch>> {
        self.get_value(Self::anchor_key(job_id))
    }

    async fn set_anchor_receipt(&self, job_id: &JobId, receipt: &ChainRef) -> Result<AnchorBatch> {
        let _guard = self.write_lock.lock().await;
        let key = Self::anchor_key(job_id);

        let mut batch: AnchorBatch = self
            .get_value(key.clone())?
            .ok_or_else(|| LedgerError::NotFound(format!("anchor batch for job {}", job_id)))?;
        batch.receipt = Some(receipt.clone());
        self.put_value(key, &batch)?;
        Ok(batch)
    }

    async fn get_cursor(&self, key: &str) -> Result<Option<u64>> {
        self.get_value(Self::cursor_storage_key(key))
    }

    async fn set_cursor(&self, key: &str, next_block: u64) -> Result<()> {
        self.put_value(Self::cursor_storage_key(key), &next_block)
    }

    async fn get_reputation(&self, address: &Address) -> Result<Option<ReputationRecord>> {
        self.get_value(Self::reputation_key(address))
    }

    async fn put_reputation(&self, record: &ReputationRecord) -> Result<()> {
        self.put_value(Self::reputation_key(&record.address), record)
    }

    async fn put_comment(&self, comment: &Comment) -> Result<()> {
        self.put_value(
            Self::comment_key(comment.target, &comment.target_id, comment.id.as_str()),
            comment,
        )
    }

    async fn list_comments(&self, target: CommentTarget, target_id: &str) -> Result<Vec<Comment>> {
        let tag = match target {
            CommentTarget::Job => "job",
            CommentTarget::Submission => "submission",
        };
        let prefix = format!("comment:{}:{}:", tag, target_id).into_bytes();
        let mut comments = self.scan_prefix_values::<Comment>(&prefix)?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn get_profile(&self, address: &Address) -> Result<Option<ProfileRecord>> {
        self.get_value(Self::profile_key(address))
    }

    async fn put_profile(&self, profile: &ProfileRecord) -> Result<()> {
        self.put_value(Self::profile_key(&profile.address), profile)
    }
}

impl RocksBackend {
    fn stage_agr_entry(&self, batch: &mut WriteBatch, entry: &AgrLedgerEntry) -> Result<()> {
        let encoded = Self::encode(entry)?;
        batch.put(Self::agr_key(entry.id.as_str()), encoded);
        batch.put(
            Self::agr_addr_index_key(&entry.address, entry.id.as_str()),
            entry.id.as_str().as_bytes(),
        );
        if let Some(job_id) = &entry.job_id {
            batch.put(
                Self::agr_job_index_key(job_id, &entry.reason, entry.id.as_str()),
                entry.id.as_str().as_bytes(),
            );
        }
        Ok(())
    }
}
