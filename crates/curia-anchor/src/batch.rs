use crate::calldata::{decode_hex32, post_anchor_calldata};
use crate::error::{AnchorError, Result};
use crate::snapshot::{JobSnapshot, SnapshotComments};
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use curia_storage::LedgerStore;
use curia_types::{
    to_canonical_bytes, AnchorBatch, ChainRef, CommentTarget, JobId,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds canonical job-history snapshots and maintains the one-per-job
/// anchor batch rows they hash into.
pub struct AnchorService {
    store: Arc<dyn LedgerStore>,
    snapshots: Arc<dyn SnapshotStore>,
    schema_version: u32,
}

impl AnchorService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        snapshots: Arc<dyn SnapshotStore>,
        schema_version: u32,
    ) -> Self {
        Self {
            store,
            snapshots,
            schema_version,
        }
    }

    /// Assemble a job's full history as of `at`. The off-chain ledger stays
    /// source-of-truth; this document exists for transparency and anchoring.
    pub async fn build_snapshot_at(&self, job_id: &JobId, at: DateTime<Utc>) -> Result<JobSnapshot> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| AnchorError::JobNotFound(job_id.to_string()))?;

        let submissions = self.store.list_submissions_for_job(job_id).await?;
        let jury_votes = self.store.list_jury_votes_for_job(job_id).await?;
        let final_votes = self.store.list_final_votes_for_job(job_id).await?;

        let job_comments = self
            .store
            .list_comments(CommentTarget::Job, job_id.as_str())
            .await?;

        let mut submission_comments = BTreeMap::new();
        for sub in &submissions {
            let thread = self
                .store
                .list_comments(CommentTarget::Submission, sub.id.as_str())
                .await?;
            submission_comments.insert(sub.id.to_string(), thread);
        }

        Ok(JobSnapshot {
            schema_version: self.schema_version,
            generated_at: JobSnapshot::generated_at_string(at),
            job,
            submissions,
            jury_votes,
            final_votes,
            comments: SnapshotComments {
                job: job_comments,
                submissions: submission_comments,
            },
        })
    }

    pub async fn build_snapshot(&self, job_id: &JobId) -> Result<JobSnapshot> {
        self.build_snapshot_at(job_id, Utc::now()).await
    }

    /// Create the job's anchor batch, idempotently.
    ///
    /// An existing batch is returned unchanged — never re-hashed, never
    /// overwritten. Otherwise: snapshot → canonical bytes → SHA-256 root →
    /// random salt → persist snapshot → persist batch row.
    pub async fn create_anchor_batch(&self, job_id: &JobId) -> Result<AnchorBatch> {
        if let Some(existing) = self.store.get_anchor_batch(job_id).await? {
            debug!(job_id = %job_id, "Anchor batch already exists, returning it");
            return Ok(existing);
        }

        let snapshot = self.build_snapshot(job_id).await?;
        let bytes = to_canonical_bytes(&snapshot)?;

        let root_hex = format!("0x{}", hex::encode(Sha256::digest(&bytes)));

        let mut salt = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt_hex = format!("0x{}", hex::encode(salt));

        let uri = self.snapshots.put_snapshot(job_id, &bytes).await?;

        let batch = AnchorBatch::new(
            job_id.clone(),
            self.schema_version,
            salt_hex,
            root_hex,
            uri,
        );

        if !self.store.insert_anchor_batch(&batch).await? {
            // Lost the create race; the first writer's batch stands.
            let existing = self
                .store
                .get_anchor_batch(job_id)
                .await?
                .ok_or_else(|| AnchorError::BatchMissing(job_id.to_string()))?;
            return Ok(existing);
        }

        info!(
            job_id = %job_id,
            anchor_root = %batch.anchor_root,
            uri = %batch.anchor_uri,
            "Anchor batch created"
        );
        Ok(batch)
    }

    /// Operator-only: record the on-chain receipt after `postAnchor` was
    /// executed elsewhere. Fails when no batch exists yet — anchoring must be
    /// created before a receipt can land on it.
    pub async fn attach_receipt(&self, job_id: &JobId, receipt: ChainRef) -> Result<AnchorBatch> {
        if self.store.get_anchor_batch(job_id).await?.is_none() {
            return Err(AnchorError::BatchMissing(job_id.to_string()));
        }

        let batch = self.store.set_anchor_receipt(job_id, &receipt).await?;
        info!(
            job_id = %job_id,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Anchor receipt attached"
        );
        Ok(batch)
    }

    /// Calldata for posting the stored batch's root on-chain.
    pub async fn prepare_post_anchor(&self, job_id: &JobId) -> Result<Vec<u8>> {
        let batch = self
            .store
            .get_anchor_batch(job_id)
            .await?
            .ok_or_else(|| AnchorError::BatchMissing(job_id.to_string()))?;

        let root = decode_hex32(&batch.anchor_root)?;
        let salt = decode_hex32(&batch.salt)?;
        Ok(post_anchor_calldata(
            &root,
            &batch.anchor_uri,
            batch.schema_version,
            &salt,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;
    use curia_storage::MemoryBackend;
    use curia_types::{Address, Comment, Job, JuryVote, Submission};

    async fn service() -> (AnchorService, Arc<dyn LedgerStore>, Job) {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let service = AnchorService::new(store.clone(), snapshots, 1);

        let job = Job::new("anchor-job", "prompt", 25.0, Some(Address::new("0xa")), vec![]);
        store.put_job(&job).await.unwrap();

        let sub = Submission::new(job.id.clone(), Address::new("0xb"), "work", vec![]);
        store.put_submission(&sub).await.unwrap();
        store
            .upsert_jury_vote(&JuryVote::new(
                job.id.clone(),
                sub.id.clone(),
                Address::new("0xc"),
                3.0,
                None,
            ))
            .await
            .unwrap();
        store
            .put_comment(&Comment::new(
                CommentTarget::Job,
                job.id.as_str(),
                Address::new("0xc"),
                "discussion",
            ))
            .await
            .unwrap();

        (service, store, job)
    }

    #[tokio::test]
    async fn test_snapshot_is_deterministic() {
        let (service, _, job) = service().await;
        let at = Utc::now();

        let a = service.build_snapshot_at(&job.id, at).await.unwrap();
        let b = service.build_snapshot_at(&job.id, at).await.unwrap();

        let bytes_a = to_canonical_bytes(&a).unwrap();
        let bytes_b = to_canonical_bytes(&b).unwrap();
        assert_eq!(bytes_a, bytes_b);
        assert_eq!(Sha256::digest(&bytes_a), Sha256::digest(&bytes_b));
    }

    #[tokio::test]
    async fn test_create_anchor_batch_is_idempotent() {
        let (service, store, job) = service().await;

        let first = service.create_anchor_batch(&job.id).await.unwrap();
        assert!(first.anchor_root.starts_with("0x"));
        assert_eq!(first.anchor_root.len(), 66);
        assert_eq!(first.salt.len(), 66);

        let second = service.create_anchor_batch(&job.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.anchor_root, second.anchor_root);
        assert_eq!(first.salt, second.salt);

        // One row, even after ledger data changed underneath.
        store
            .put_comment(&Comment::new(
                CommentTarget::Job,
                job.id.as_str(),
                Address::new("0xd"),
                "late comment",
            ))
            .await
            .unwrap();
        let third = service.create_anchor_batch(&job.id).await.unwrap();
        assert_eq!(first.anchor_root, third.anchor_root);
    }

    #[tokio::test]
    async fn test_attach_receipt_requires_batch() {
        let (service, _, job) = service().await;
        let receipt = ChainRef {
            tx_hash: "0xtx".to_string(),
            chain_id: 8453,
            contract_address: Address::new("0xreg"),
            block_number: 99,
            log_index: 1,
        };

        let err = service
            .attach_receipt(&job.id, receipt.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorError::BatchMissing(_)));

        service.create_anchor_batch(&job.id).await.unwrap();
        let updated = service.attach_receipt(&job.id, receipt).await.unwrap();
        assert_eq!(updated.receipt.unwrap().tx_hash, "0xtx");
    }

    #[tokio::test]
    async fn test_prepare_post_anchor_uses_stored_batch() {
        let (service, _, job) = service().await;
        let batch = service.create_anchor_batch(&job.id).await.unwrap();

        let calldata = service.prepare_post_anchor(&job.id).await.unwrap();
        let root = decode_hex32(&batch.anchor_root).unwrap();
        assert_eq!(&calldata[4..36], &root);
    }
}
