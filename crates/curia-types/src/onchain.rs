use crate::address::Address;
use crate::id::{EntryId, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locator of a single on-chain event: enough to re-verify the fact against
/// any archive node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRef {
    pub tx_hash: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub block_number: u64,
    pub log_index: u64,
}

/// Deterministic id for an on-chain-sourced fact. Re-ingesting the same
/// event always derives the same id, which is what makes inserts idempotent.
pub fn event_id(chain_id: u64, tx_hash: &str, log_index: u64) -> EntryId {
    EntryId::new(format!("{}:{}:{}", chain_id, tx_hash, log_index))
}

/// Cursor key for an independently-scanned event source.
pub fn cursor_key(topic: &str, chain_id: u64, contract: &Address) -> String {
    format!("{}:{}:{}", topic, chain_id, contract)
}

/// Off-chain mirror of an agent's staked collateral. Mutated only by explicit
/// set operations; the receipt anchors the most recent on-chain update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRecord {
    pub address: Address,
    pub amount_usdc: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ChainRef>,
    pub updated_at: DateTime<Utc>,
}

impl StakeRecord {
    pub fn new(address: Address, amount_usdc: f64, receipt: Option<ChainRef>) -> Self {
        Self {
            address,
            amount_usdc,
            receipt,
            updated_at: Utc::now(),
        }
    }
}

/// Append-only slashing fact. On-chain-sourced events derive their id from
/// the event locator; operator-recorded ones supply their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlashingEvent {
    pub id: EntryId,
    pub agent_address: Address,
    pub amount_usdc: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ChainRef>,
    pub created_at: DateTime<Utc>,
}

/// Append-only treasury donation fact, keyed by the deterministic event id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationEvent {
    pub id: EntryId,
    pub donor_address: Address,
    /// Zero address means the chain's native asset.
    pub asset_address: Address,
    pub amount_raw: u128,
    /// Normalized estimate; null when the asset is unrecognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,
    pub purpose_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_hash: Option<String>,
    pub receipt: ChainRef,
    pub created_at: DateTime<Utc>,
}

/// Per-donor USD aggregate, accumulated incrementally from donation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorTotal {
    pub donor_address: Address,
    pub total_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_event_id: Option<EntryId>,
    pub updated_at: DateTime<Utc>,
}
