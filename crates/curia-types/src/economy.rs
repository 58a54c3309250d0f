use crate::address::Address;
use crate::id::{EntryId, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only AGR credit ledger entry. Positive delta credits, negative
/// debits; an address's balance is the running sum of its deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgrLedgerEntry {
    pub id: EntryId,
    pub address: Address,
    pub delta: i64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub created_at: DateTime<Utc>,
}

impl AgrLedgerEntry {
    pub fn new(address: Address, delta: i64, reason: impl Into<String>, job_id: Option<JobId>) -> Self {
        Self {
            id: EntryId::generate(),
            address,
            delta,
            reason: reason.into(),
            job_id,
            created_at: Utc::now(),
        }
    }
}

/// Participant reputation. Submissions bump the score; jury vote weight is
/// derived from it at cast time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub address: Address,
    pub score: f64,
    pub level: u32,
    pub wins: u32,
    pub losses: u32,
    #[serde(default)]
    pub badges: Vec<String>,
    pub last_updated_at: DateTime<Utc>,
}

impl ReputationRecord {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            score: 0.0,
            level: 1,
            wins: 0,
            losses: 0,
            badges: Vec::new(),
            last_updated_at: Utc::now(),
        }
    }

    /// Add `delta` to the score and recompute the level (one level per 100
    /// points, floor 1).
    pub fn bump(&mut self, delta: f64) {
        self.score += delta;
        self.level = ((self.score / 100.0) as u32 + 1).max(1);
        self.last_updated_at = Utc::now();
    }
}
