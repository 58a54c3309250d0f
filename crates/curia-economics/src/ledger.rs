use crate::error::{EconomicsError, Result};
use chrono::{Duration, Utc};
use curia_storage::LedgerStore;
use curia_types::{Address, AgrLedgerEntry, Job, JobId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Reason tag for the fixed credit minted to a winning submission's author.
pub const REASON_WIN: &str = "win";
/// Reason tag for AGR spent on a job's featured boost.
pub const REASON_BOOST: &str = "boost";

/// Reward knobs, fixed at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPolicy {
    pub rewards_enabled: bool,
    /// AGR credited to the winner's author when a job closes.
    pub agr_mint_per_win: i64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            rewards_enabled: true,
            agr_mint_per_win: 50,
        }
    }
}

/// Outcome of a win-reward mint attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    Minted,
    /// A `win` entry for this job already exists; retries are no-ops.
    AlreadyMinted,
}

/// AGR credit ledger: append-only signed deltas per address. Balances are
/// running sums, never stored rows.
pub struct AgrLedger {
    store: Arc<dyn LedgerStore>,
}

impl AgrLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn balance(&self, address: &Address) -> Result<i64> {
        let entries = self.store.list_agr_entries(address).await?;
        Ok(entries.iter().map(|e| e.delta).sum())
    }

    /// Lifetime credits (sum of positive deltas).
    pub async fn earned(&self, address: &Address) -> Result<i64> {
        let entries = self.store.list_agr_entries(address).await?;
        Ok(entries.iter().map(|e| e.delta.max(0)).sum())
    }

    /// Lifetime spend (negated sum of negative deltas).
    pub async fn spent(&self, address: &Address) -> Result<i64> {
        let entries = self.store.list_agr_entries(address).await?;
        Ok(-entries.iter().map(|e| e.delta.min(0)).sum::<i64>())
    }

    pub async fn credit(
        &self,
        address: &Address,
        amount: i64,
        reason: &str,
        job_id: Option<JobId>,
    ) -> Result<AgrLedgerEntry> {
        if amount <= 0 {
            return Err(EconomicsError::InvalidAmount(format!(
                "credit must be positive, got {}",
                amount
            )));
        }

        let entry = AgrLedgerEntry::new(address.clone(), amount, reason, job_id);
        self.store.append_agr_entry(&entry).await?;

        info!(
            address = %address,
            delta = amount,
            reason = reason,
            "AGR credited"
        );
        Ok(entry)
    }

    /// Mint the per-win credit to a job winner's author, at most once per job.
    ///
    /// The guard is a ledger lookup for an existing `win` entry on the job,
    /// so a retried close never double-mints.
    pub async fn mint_win_reward(
        &self,
        job_id: &JobId,
        winner: &Address,
        amount: i64,
    ) -> Result<MintOutcome> {
        if self
            .store
            .find_agr_entry_for_job(job_id, REASON_WIN)
            .await?
            .is_some()
        {
            debug!(job_id = %job_id, "Win reward already minted, skipping");
            return Ok(MintOutcome::AlreadyMinted);
        }

        self.credit(winner, amount, REASON_WIN, Some(job_id.clone()))
            .await?;
        Ok(MintOutcome::Minted)
    }

    /// Spend AGR to feature a job: debit the spender and extend the job's
    /// featured window in one atomic storage write. A failed debit leaves the
    /// job untouched.
    pub async fn boost_job(
        &self,
        job_id: &JobId,
        spender: &Address,
        amount: i64,
        duration: Duration,
    ) -> Result<Job> {
        if amount <= 0 {
            return Err(EconomicsError::InvalidAmount(format!(
                "boost must be positive, got {}",
                amount
            )));
        }

        let mut job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| EconomicsError::JobNotFound(job_id.to_string()))?;

        let available = self.balance(spender).await?;
        if available < amount {
            return Err(EconomicsError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let now = Utc::now();
        let base = match job.featured_until {
            Some(until) if until > now => until,
            _ => now,
        };
        job.featured_until = Some(base + duration);
        job.featured_score += amount;

        let entry = AgrLedgerEntry::new(spender.clone(), -amount, REASON_BOOST, Some(job_id.clone()));
        self.store.append_agr_entry_with_job(&entry, &job).await?;

        info!(
            job_id = %job_id,
            spender = %spender,
            amount = amount,
            featured_score = job.featured_score,
            "Job boosted"
        );
        Ok(job)
    }
}
