//! Backend conformance suite: every ledger property is exercised through the
//! `LedgerStore` trait and run against both backends. Core logic must behave
//! identically regardless of which backend was selected at process start.

use chrono::Utc;
use curia_storage::{LedgerStore, MemoryBackend, RocksBackend};
use curia_types::{
    event_id, Address, AgrLedgerEntry, AnchorBatch, AvatarMode, ChainRef, Comment, CommentTarget,
    DonationEvent, DonorTotal, FinalVote, Job, JobId, JuryVote, ProfileRecord, ReputationRecord,
    SlashingEvent, StakeRecord, Submission, SubmissionId,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn run_all(store: Arc<dyn LedgerStore>) {
    check_job_and_submissions(store.clone()).await;
    check_vote_uniqueness(store.clone()).await;
    check_stake_and_slashing(store.clone()).await;
    check_donations_and_totals(store.clone()).await;
    check_agr_ledger(store.clone()).await;
    check_anchor_batches(store.clone()).await;
    check_cursors(store.clone()).await;
    check_reputation_comments_profiles(store).await;
}

#[tokio::test]
async fn test_memory_backend_conformance() {
    run_all(Arc::new(MemoryBackend::new())).await;
}

#[tokio::test]
async fn test_rocks_backend_conformance() {
    let dir = TempDir::new().unwrap();
    run_all(Arc::new(RocksBackend::new(dir.path()).unwrap())).await;
}

fn chain_ref(tx: &str, log_index: u64) -> ChainRef {
    ChainRef {
        tx_hash: tx.to_string(),
        chain_id: 8453,
        contract_address: Address::new("0xvault"),
        block_number: 100,
        log_index,
    }
}

async fn check_job_and_submissions(store: Arc<dyn LedgerStore>) {
    let job = Job::new("conf-job", "prompt", 25.0, Some(Address::new("0xa")), vec![]);
    store.put_job(&job).await.unwrap();

    let loaded = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "conf-job");
    assert!(loaded.is_open());

    let s1 = Submission::new(job.id.clone(), Address::new("0xb"), "first", vec![]);
    let s2 = Submission::new(job.id.clone(), Address::new("0xc"), "second", vec![]);
    store.put_submission(&s1).await.unwrap();
    store.put_submission(&s2).await.unwrap();

    let subs = store.list_submissions_for_job(&job.id).await.unwrap();
    assert_eq!(subs.len(), 2);
    assert!(subs[0].created_at <= subs[1].created_at);

    assert!(store
        .get_submission(&s1.id)
        .await
        .unwrap()
        .is_some());
}

async fn check_vote_uniqueness(store: Arc<dyn LedgerStore>) {
    let job = JobId::new("conf-votes");
    let voter = Address::new("0xv");

    let first = JuryVote::new(
        job.clone(),
        SubmissionId::new("s1"),
        voter.clone(),
        2.0,
        None,
    );
    let stored = store.upsert_jury_vote(&first).await.unwrap();

    let revote = JuryVote::new(
        job.clone(),
        SubmissionId::new("s2"),
        voter.clone(),
        4.0,
        None,
    );
    let restored = store.upsert_jury_vote(&revote).await.unwrap();

    // Exactly one row per (job, voter), same id, latest choice.
    assert_eq!(stored.id, restored.id);
    let votes = store.list_jury_votes_for_job(&job).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].submission_id, SubmissionId::new("s2"));
    assert_eq!(votes[0].weight, 4.0);

    let fv = FinalVote::new(job.clone(), SubmissionId::new("s1"), voter.clone());
    let fv_stored = store.upsert_final_vote(&fv).await.unwrap();
    let fv2 = FinalVote::new(job.clone(), SubmissionId::new("s2"), voter.clone());
    let fv_restored = store.upsert_final_vote(&fv2).await.unwrap();

    assert_eq!(fv_stored.id, fv_restored.id);
    let finals = store.list_final_votes_for_job(&job).await.unwrap();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].submission_id, SubmissionId::new("s2"));

    let got = store.get_final_vote(&job, &voter).await.unwrap().unwrap();
    assert_eq!(got.submission_id, SubmissionId::new("s2"));
}

async fn check_stake_and_slashing(store: Arc<dyn LedgerStore>) {
    let agent = Address::new("0xagent");
    store
        .set_stake(&StakeRecord::new(
            agent.clone(),
            50.0,
            Some(chain_ref("0xt1", 0)),
        ))
        .await
        .unwrap();

    let stake = store.get_stake(&agent).await.unwrap().unwrap();
    assert_eq!(stake.amount_usdc, 50.0);
    assert!(stake.receipt.is_some());

    let slash = SlashingEvent {
        id: event_id(8453, "0xslash", 2),
        agent_address: agent.clone(),
        amount_usdc: 10.0,
        recipient_address: Some(Address::new("0xr")),
        job_id: None,
        receipt: Some(chain_ref("0xslash", 2)),
        created_at: Utc::now(),
    };

    assert!(store.insert_slashing_event(&slash).await.unwrap());
    assert!(!store.insert_slashing_event(&slash).await.unwrap());

    let events = store.list_slashing_events_for_agent(&agent).await.unwrap();
    assert_eq!(events.len(), 1);
}

async fn check_donations_and_totals(store: Arc<dyn LedgerStore>) {
    let donor = Address::new("0xdonor");
    let event = DonationEvent {
        id: event_id(8453, "0xdon", 1),
        donor_address: donor.clone(),
        asset_address: Address::zero(),
        amount_raw: 2_000_000_000_000_000_000,
        amount_usd: Some(5000.0),
        purpose_id: 1,
        memo_hash: Some("0xmemo".to_string()),
        receipt: chain_ref("0xdon", 1),
        created_at: Utc::now(),
    };

    assert!(store.insert_donation_event(&event).await.unwrap());
    assert!(!store.insert_donation_event(&event).await.unwrap());

    assert!(store.get_donor_total(&donor).await.unwrap().is_none());
    store
        .put_donor_total(&DonorTotal {
            donor_address: donor.clone(),
            total_usd: 5000.0,
            first_event_id: Some(event.id.clone()),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let total = store.get_donor_total(&donor).await.unwrap().unwrap();
    assert_eq!(total.total_usd, 5000.0);
    assert_eq!(total.first_event_id, Some(event.id));
}

async fn check_agr_ledger(store: Arc<dyn LedgerStore>) {
    let addr = Address::new("0xwinner");
    let job = JobId::new("conf-agr");

    store
        .append_agr_entry(&AgrLedgerEntry::new(
            addr.clone(),
            50,
            "win",
            Some(job.clone()),
        ))
        .await
        .unwrap();
    store
        .append_agr_entry(&AgrLedgerEntry::new(addr.clone(), -20, "boost", None))
        .await
        .unwrap();

    let entries = store.list_agr_entries(&addr).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.delta).sum::<i64>(), 30);

    assert!(store
        .find_agr_entry_for_job(&job, "win")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .find_agr_entry_for_job(&job, "boost")
        .await
        .unwrap()
        .is_none());

    // Atomic entry + job write.
    let mut boosted = Job::new("boosted", "p", 1.0, None, vec![]);
    boosted.featured_score = 20;
    store
        .append_agr_entry_with_job(
            &AgrLedgerEntry::new(addr.clone(), -20, "boost", Some(boosted.id.clone())),
            &boosted,
        )
        .await
        .unwrap();

    let reloaded = store.get_job(&boosted.id).await.unwrap().unwrap();
    assert_eq!(reloaded.featured_score, 20);
    let entries = store.list_agr_entries(&addr).await.unwrap();
    assert_eq!(entries.len(), 3);
}

async fn check_anchor_batches(store: Arc<dyn LedgerStore>) {
    let job = JobId::new("conf-anchor");
    let batch = AnchorBatch::new(
        job.clone(),
        1,
        "0xsalt".to_string(),
        "0xroot".to_string(),
        "mem://anchors/conf-anchor.json".to_string(),
    );

    // Receipt attachment before the batch exists must fail.
    assert!(store
        .set_anchor_receipt(&job, &chain_ref("0xanc", 0))
        .await
        .is_err());

    assert!(store.insert_anchor_batch(&batch).await.unwrap());

    // Second create is a no-op; the stored root never changes.
    let rival = AnchorBatch::new(
        job.clone(),
        1,
        "0xother".to_string(),
        "0xother".to_string(),
        "mem://other".to_string(),
    );
    assert!(!store.insert_anchor_batch(&rival).await.unwrap());
    let stored = store.get_anchor_batch(&job).await.unwrap().unwrap();
    assert_eq!(stored.anchor_root, "0xroot");

    let updated = store
        .set_anchor_receipt(&job, &chain_ref("0xanc", 0))
        .await
        .unwrap();
    assert!(updated.receipt.is_some());
    assert_eq!(updated.anchor_root, "0xroot");
}

async fn check_cursors(store: Arc<dyn LedgerStore>) {
    let key = "stake_vault:8453:0xvault";
    assert!(store.get_cursor(key).await.unwrap().is_none());

    store.set_cursor(key, 981).await.unwrap();
    assert_eq!(store.get_cursor(key).await.unwrap(), Some(981));

    store.set_cursor(key, 1500).await.unwrap();
    assert_eq!(store.get_cursor(key).await.unwrap(), Some(1500));
}

async fn check_reputation_comments_profiles(store: Arc<dyn LedgerStore>) {
    let addr = Address::new("0xrep");
    let mut rep = ReputationRecord::new(addr.clone());
    rep.bump(120.0);
    store.put_reputation(&rep).await.unwrap();

    let loaded = store.get_reputation(&addr).await.unwrap().unwrap();
    assert_eq!(loaded.score, 120.0);
    assert_eq!(loaded.level, 2);

    let comment = Comment::new(CommentTarget::Job, "conf-job", addr.clone(), "hello");
    store.put_comment(&comment).await.unwrap();
    let comments = store
        .list_comments(CommentTarget::Job, "conf-job")
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert!(store
        .list_comments(CommentTarget::Submission, "conf-job")
        .await
        .unwrap()
        .is_empty());

    let mut profile = ProfileRecord::new(addr.clone());
    assert_eq!(profile.avatar_mode, AvatarMode::Manual);
    profile.avatar_mode = AvatarMode::Donor;
    store.put_profile(&profile).await.unwrap();
    assert_eq!(
        store.get_profile(&addr).await.unwrap().unwrap().avatar_mode,
        AvatarMode::Donor
    );
}
