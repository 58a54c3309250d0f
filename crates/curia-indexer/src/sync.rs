use crate::client::{ChainClient, EventLog};
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::events::{
    decode_deposited, decode_donation_received, decode_slashed, decode_withdrawn, event_topic,
    SIG_DEPOSITED, SIG_DONATION_RECEIVED, SIG_SLASHED, SIG_WITHDRAWN,
};
use chrono::Utc;
use curia_storage::LedgerStore;
use curia_types::{
    cursor_key, event_id, Address, AvatarMode, ChainRef, DonationEvent, DonorTotal, ProfileRecord,
    SlashingEvent, StakeRecord,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const STAKE_VAULT_SOURCE: &str = "stake_vault";
const TREASURY_VAULT_SOURCE: &str = "treasury_vault";

/// Vault raw units per USDC (6 decimals).
const USDC_UNITS: f64 = 1_000_000.0;
/// Native asset wei per unit.
const NATIVE_UNITS: f64 = 1e18;

#[derive(Debug, Clone, Default)]
pub struct StakeSyncReport {
    pub from_block: u64,
    pub to_block: u64,
    pub touched_agents: usize,
    pub stake_updates: usize,
    pub slashes_recorded: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TreasurySyncReport {
    pub from_block: u64,
    pub to_block: u64,
    pub donations_seen: usize,
    pub donations_recorded: usize,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub chain_id: u64,
    pub latest: u64,
    pub safe_latest: u64,
    pub stake: Option<StakeSyncReport>,
    pub treasury: Option<TreasurySyncReport>,
}

/// Compute the scan window for one cycle. `None` means the source is caught
/// up and the cycle is a no-op.
fn scan_window(
    cursor: Option<u64>,
    safe_latest: u64,
    lookback: u64,
    batch_size: u64,
) -> Option<(u64, u64)> {
    let from = match cursor {
        Some(block) => block,
        None => safe_latest.saturating_sub(lookback),
    };
    let to = (from + batch_size.max(1) - 1).min(safe_latest);
    if to < from {
        None
    } else {
        Some((from, to))
    }
}

/// On-chain event reconciler.
///
/// Polls each configured source in confirmation-safe windows and writes
/// stake/slash/donation facts into the ledger idempotently. Cursors advance
/// only after a window's writes are durable, so an aborted cycle simply
/// rescans — every downstream write re-derives the same facts.
pub struct Indexer {
    store: Arc<dyn LedgerStore>,
    client: Arc<dyn ChainClient>,
    config: IndexerConfig,
    /// One lock per source key: two passes over the same source must never
    /// overlap, or they would race on cursor advancement.
    source_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        client: Arc<dyn ChainClient>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn source_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.source_locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// One reconciliation pass over every configured source.
    pub async fn sync_once(&self) -> Result<SyncReport> {
        let chain_id = self.client.chain_id().await?;
        if let Some(expected) = self.config.expected_chain_id {
            if expected != chain_id {
                return Err(IndexerError::ChainIdMismatch {
                    expected,
                    actual: chain_id,
                });
            }
        }

        let latest = self.client.latest_block().await?;
        let safe_latest = latest.saturating_sub(self.config.confirmations);

        let stake = match &self.config.stake_vault {
            Some(vault) if !vault.is_zero() => {
                Some(self.sync_stake_vault(chain_id, safe_latest, vault).await?)
            }
            _ => None,
        };

        let treasury = match &self.config.treasury_vault {
            Some(vault) if !vault.is_zero() => Some(
                self.sync_treasury_vault(chain_id, safe_latest, vault)
                    .await?,
            ),
            _ => None,
        };

        Ok(SyncReport {
            chain_id,
            latest,
            safe_latest,
            stake,
            treasury,
        })
    }

    /// Poll loop for long-lived deployments. Failed cycles are logged and
    /// retried next interval; cursor durability is the recovery mechanism.
    pub async fn run(&self) {
        loop {
            match self.sync_once().await {
                Ok(report) => {
                    info!(
                        chain_id = report.chain_id,
                        latest = report.latest,
                        safe_latest = report.safe_latest,
                        "Sync cycle complete"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Sync cycle failed");
                }
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn chain_ref(&self, chain_id: u64, contract: &Address, log: &EventLog) -> ChainRef {
        ChainRef {
            tx_hash: log.tx_hash.clone(),
            chain_id,
            contract_address: contract.clone(),
            block_number: log.block_number,
            log_index: log.log_index,
        }
    }

    async fn sync_stake_vault(
        &self,
        chain_id: u64,
        safe_latest: u64,
        vault: &Address,
    ) -> Result<StakeSyncReport> {
        let key = cursor_key(STAKE_VAULT_SOURCE, chain_id, vault);
        let lock = self.source_lock(&key).await;
        let _guard = lock.lock().await;

        let cursor = self.store.get_cursor(&key).await?;
        let Some((from_block, to_block)) = scan_window(
            cursor,
            safe_latest,
            self.config.lookback,
            self.config.batch_size,
        ) else {
            return Ok(StakeSyncReport::default());
        };

        // Collect every event that touches an agent's balance; the latest
        // receipt per agent (by block then log index) anchors the refresh.
        let mut touched: HashMap<Address, (u64, u64, ChainRef)> = HashMap::new();
        let mut note_touch = |agent: Address, log: &EventLog, anchor: ChainRef| {
            let slot = (log.block_number, log.log_index);
            match touched.get(&agent) {
                Some((block, index, _)) if (*block, *index) >= slot => {}
                _ => {
                    touched.insert(agent, (slot.0, slot.1, anchor));
                }
            }
        };

        for log in self
            .client
            .get_logs(vault, event_topic(SIG_DEPOSITED), from_block, to_block)
            .await?
        {
            let ev = decode_deposited(&log)?;
            note_touch(ev.agent, &log, self.chain_ref(chain_id, vault, &log));
        }

        for log in self
            .client
            .get_logs(vault, event_topic(SIG_WITHDRAWN), from_block, to_block)
            .await?
        {
            let ev = decode_withdrawn(&log)?;
            note_touch(ev.agent, &log, self.chain_ref(chain_id, vault, &log));
        }

        let mut slashes_recorded = 0;
        for log in self
            .client
            .get_logs(vault, event_topic(SIG_SLASHED), from_block, to_block)
            .await?
        {
            let ev = decode_slashed(&log)?;
            let anchor = self.chain_ref(chain_id, vault, &log);
            note_touch(ev.agent.clone(), &log, anchor.clone());

            let slash = SlashingEvent {
                id: event_id(chain_id, &log.tx_hash, log.log_index),
                agent_address: ev.agent,
                amount_usdc: ev.actual_amount as f64 / USDC_UNITS,
                recipient_address: Some(ev.recipient),
                job_id: None,
                receipt: Some(anchor),
                created_at: Utc::now(),
            };
            if self.store.insert_slashing_event(&slash).await? {
                slashes_recorded += 1;
            }
        }

        // One balance read per touched agent for the whole window, not one
        // per event; the persisted amount reflects the vault's current state.
        let mut stake_updates = 0;
        for (agent, (_, _, anchor)) in &touched {
            let raw = self.client.stake_of(vault, agent).await?;
            let record = StakeRecord::new(agent.clone(), raw as f64 / USDC_UNITS, Some(anchor.clone()));
            self.store.set_stake(&record).await?;
            stake_updates += 1;
        }

        self.store.set_cursor(&key, to_block + 1).await?;

        info!(
            source = %key,
            from_block = from_block,
            to_block = to_block,
            touched_agents = touched.len(),
            slashes_recorded = slashes_recorded,
            "Stake vault window reconciled"
        );

        Ok(StakeSyncReport {
            from_block,
            to_block,
            touched_agents: touched.len(),
            stake_updates,
            slashes_recorded,
        })
    }

    fn donation_usd(&self, asset: &Address, amount_raw: u128) -> Option<f64> {
        if asset.is_zero() {
            return Some(amount_raw as f64 / NATIVE_UNITS * self.config.native_usd_rate);
        }
        if let Some(stablecoin) = &self.config.stablecoin_address {
            if asset == stablecoin {
                return Some(amount_raw as f64 / USDC_UNITS);
            }
        }
        None
    }

    async fn sync_treasury_vault(
        &self,
        chain_id: u64,
        safe_latest: u64,
        vault: &Address,
    ) -> Result<TreasurySyncReport> {
        let key = cursor_key(TREASURY_VAULT_SOURCE, chain_id, vault);
        let lock = self.source_lock(&key).await;
        let _guard = lock.lock().await;

        let cursor = self.store.get_cursor(&key).await?;
        let Some((from_block, to_block)) = scan_window(
            cursor,
            safe_latest,
            self.config.lookback,
            self.config.batch_size,
        ) else {
            return Ok(TreasurySyncReport::default());
        };

        let mut donations_seen = 0;
        let mut donations_recorded = 0;

        for log in self
            .client
            .get_logs(
                vault,
                event_topic(SIG_DONATION_RECEIVED),
                from_block,
                to_block,
            )
            .await?
        {
            donations_seen += 1;
            let ev = decode_donation_received(&log)?;
            let amount_usd = self.donation_usd(&ev.asset, ev.amount);

            let event = DonationEvent {
                id: event_id(chain_id, &log.tx_hash, log.log_index),
                donor_address: ev.donor.clone(),
                asset_address: ev.asset,
                amount_raw: ev.amount,
                amount_usd,
                purpose_id: ev.purpose_id,
                memo_hash: Some(format!("0x{}", hex::encode(ev.memo_hash))),
                receipt: self.chain_ref(chain_id, vault, &log),
                created_at: Utc::now(),
            };

            // Dedup by deterministic id; totals only accumulate for rows
            // that actually landed.
            if self.store.insert_donation_event(&event).await? {
                donations_recorded += 1;
                self.accumulate_donor_total(&ev.donor, &event).await?;
            }
        }

        self.store.set_cursor(&key, to_block + 1).await?;

        info!(
            source = %key,
            from_block = from_block,
            to_block = to_block,
            donations_seen = donations_seen,
            donations_recorded = donations_recorded,
            "Treasury vault window reconciled"
        );

        Ok(TreasurySyncReport {
            from_block,
            to_block,
            donations_seen,
            donations_recorded,
        })
    }

    async fn accumulate_donor_total(&self, donor: &Address, event: &DonationEvent) -> Result<()> {
        let existing = self.store.get_donor_total(donor).await?;
        let previous_usd = existing.as_ref().map(|t| t.total_usd).unwrap_or(0.0);

        let total = DonorTotal {
            donor_address: donor.clone(),
            total_usd: previous_usd + event.amount_usd.unwrap_or(0.0),
            first_event_id: existing
                .and_then(|t| t.first_event_id)
                .or_else(|| Some(event.id.clone())),
            updated_at: Utc::now(),
        };
        self.store.put_donor_total(&total).await?;

        // One-way flip into donor-avatar mode when the threshold is crossed.
        let threshold = self.config.donor_avatar_threshold_usd;
        if previous_usd < threshold && total.total_usd >= threshold {
            let mut profile = self
                .store
                .get_profile(donor)
                .await?
                .unwrap_or_else(|| ProfileRecord::new(donor.clone()));
            if profile.avatar_mode != AvatarMode::Donor {
                profile.avatar_mode = AvatarMode::Donor;
                profile.updated_at = Utc::now();
                self.store.put_profile(&profile).await?;
                info!(donor = %donor, total_usd = total.total_usd, "Donor avatar enabled");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::keccak256;
    use async_trait::async_trait;
    use curia_storage::MemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn address_topic(addr: &Address) -> [u8; 32] {
        let bytes = hex::decode(addr.as_str().trim_start_matches("0x")).unwrap();
        let mut topic = [0u8; 32];
        topic[32 - bytes.len()..].copy_from_slice(&bytes);
        topic
    }

    fn amount_word(amount: u128) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&amount.to_be_bytes());
        word
    }

    struct MockChain {
        chain_id: u64,
        latest: u64,
        logs: Vec<([u8; 32], EventLog)>,
        stakes: HashMap<Address, u128>,
        stake_calls: AtomicUsize,
    }

    impl MockChain {
        fn new(chain_id: u64, latest: u64) -> Self {
            Self {
                chain_id,
                latest,
                logs: Vec::new(),
                stakes: HashMap::new(),
                stake_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn chain_id(&self) -> Result<u64> {
            Ok(self.chain_id)
        }

        async fn latest_block(&self) -> Result<u64> {
            Ok(self.latest)
        }

        async fn get_logs(
            &self,
            _contract: &Address,
            topic0: [u8; 32],
            from_block: u64,
            to_block: u64,
        ) -> Result<Vec<EventLog>> {
            Ok(self
                .logs
                .iter()
                .filter(|(t, log)| {
                    *t == topic0 && log.block_number >= from_block && log.block_number <= to_block
                })
                .map(|(_, log)| log.clone())
                .collect())
        }

        async fn stake_of(&self, _vault: &Address, agent: &Address) -> Result<u128> {
            self.stake_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.stakes.get(agent).copied().unwrap_or(0))
        }
    }

    fn vault() -> Address {
        Address::new("0x00000000000000000000000000000000000000aa")
    }

    fn agent() -> Address {
        Address::new("0x2222222222222222222222222222222222222222")
    }

    fn deposit_log(block: u64, log_index: u64, agent: &Address, amount: u128) -> EventLog {
        EventLog {
            address: vault(),
            topics: vec![
                event_topic(SIG_DEPOSITED),
                address_topic(&Address::new("0x1111111111111111111111111111111111111111")),
                address_topic(agent),
            ],
            data: amount_word(amount).to_vec(),
            block_number: block,
            tx_hash: format!("0xdep{}", log_index),
            log_index,
        }
    }

    fn slash_log(block: u64, log_index: u64, agent: &Address, actual: u128) -> EventLog {
        let mut data = amount_word(actual).to_vec();
        data.extend_from_slice(&amount_word(actual));
        EventLog {
            address: vault(),
            topics: vec![
                event_topic(SIG_SLASHED),
                address_topic(agent),
                address_topic(&Address::new("0x3333333333333333333333333333333333333333")),
            ],
            data,
            block_number: block,
            tx_hash: format!("0xsl{}", log_index),
            log_index,
        }
    }

    fn donation_log(block: u64, log_index: u64, donor: &Address, asset: &Address, amount: u128) -> EventLog {
        let mut purpose_topic = [0u8; 32];
        purpose_topic[31] = 1;
        let mut data = amount_word(amount).to_vec();
        data.extend_from_slice(&keccak256(b"memo"));
        EventLog {
            address: vault(),
            topics: vec![
                event_topic(SIG_DONATION_RECEIVED),
                address_topic(donor),
                address_topic(asset),
                purpose_topic,
            ],
            data,
            block_number: block,
            tx_hash: format!("0xdon{}", log_index),
            log_index,
        }
    }

    fn stake_config() -> IndexerConfig {
        IndexerConfig {
            confirmations: 20,
            lookback: 50,
            batch_size: 2000,
            stake_vault: Some(vault()),
            ..IndexerConfig::default()
        }
    }

    #[test]
    fn test_scan_window_cold_start_with_confirmation_lag() {
        // latest=1000, confirmations=20 → safe_latest=980; lookback=50.
        assert_eq!(scan_window(None, 980, 50, 2000), Some((930, 980)));
        // Batch clamps the window.
        assert_eq!(scan_window(None, 980, 50, 10), Some((930, 939)));
        // Caught up: cursor past safe_latest is a no-op.
        assert_eq!(scan_window(Some(981), 980, 50, 2000), None);
        // Resuming from a cursor.
        assert_eq!(scan_window(Some(100), 980, 50, 2000), Some((100, 980)));
    }

    #[tokio::test]
    async fn test_stake_sync_scans_safe_window_and_advances_cursor() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let mut chain = MockChain::new(8453, 1000);
        chain.stakes.insert(agent(), 25_000_000);
        chain.logs.push((
            event_topic(SIG_DEPOSITED),
            deposit_log(950, 0, &agent(), 25_000_000),
        ));

        let indexer = Indexer::new(store.clone(), Arc::new(chain), stake_config());
        let report = indexer.sync_once().await.unwrap();

        assert_eq!(report.safe_latest, 980);
        let stake_report = report.stake.unwrap();
        assert_eq!(stake_report.from_block, 930);
        assert_eq!(stake_report.to_block, 980);
        assert_eq!(stake_report.stake_updates, 1);

        let key = cursor_key(STAKE_VAULT_SOURCE, 8453, &vault());
        assert_eq!(store.get_cursor(&key).await.unwrap(), Some(981));

        let stake = store.get_stake(&agent()).await.unwrap().unwrap();
        assert_eq!(stake.amount_usdc, 25.0);
        assert!(stake.receipt.is_some());
    }

    #[tokio::test]
    async fn test_multiple_events_one_balance_read_per_agent() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let mut chain = MockChain::new(8453, 1000);
        chain.stakes.insert(agent(), 40_000_000);
        chain.logs.push((
            event_topic(SIG_DEPOSITED),
            deposit_log(940, 0, &agent(), 10_000_000),
        ));
        chain.logs.push((
            event_topic(SIG_DEPOSITED),
            deposit_log(945, 1, &agent(), 10_000_000),
        ));
        chain.logs.push((
            event_topic(SIG_SLASHED),
            slash_log(950, 2, &agent(), 5_000_000),
        ));

        let chain = Arc::new(chain);
        let indexer = Indexer::new(store.clone(), chain.clone(), stake_config());
        indexer.sync_once().await.unwrap();

        // Three events touching one agent collapse to a single stakeOf call.
        assert_eq!(chain.stake_calls.load(Ordering::SeqCst), 1);

        // The stored receipt anchor is the latest event in the window.
        let stake = store.get_stake(&agent()).await.unwrap().unwrap();
        assert_eq!(stake.receipt.unwrap().block_number, 950);
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let mut chain = MockChain::new(8453, 1000);
        chain.stakes.insert(agent(), 0);
        chain.logs.push((
            event_topic(SIG_SLASHED),
            slash_log(950, 0, &agent(), 5_000_000),
        ));

        let indexer = Indexer::new(store.clone(), Arc::new(chain), stake_config());
        indexer.sync_once().await.unwrap();

        // Reset the cursor to simulate an aborted cycle and rescan.
        let key = cursor_key(STAKE_VAULT_SOURCE, 8453, &vault());
        store.set_cursor(&key, 930).await.unwrap();
        let report = indexer.sync_once().await.unwrap();

        // The slash was seen again but deduped by its deterministic id.
        assert_eq!(report.stake.unwrap().slashes_recorded, 0);
        let events = store
            .list_slashing_events_for_agent(&agent())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_donation_normalization_and_totals() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let donor = Address::new("0x4444444444444444444444444444444444444444");
        let usdc = Address::new("0x00000000000000000000000000000000000000cc");
        let unknown = Address::new("0x00000000000000000000000000000000000000dd");

        let mut chain = MockChain::new(8453, 1000);
        // 0.02 native at 2500 → $50.
        chain.logs.push((
            event_topic(SIG_DONATION_RECEIVED),
            donation_log(940, 0, &donor, &Address::zero(), 20_000_000_000_000_000),
        ));
        // 60 USDC → $60.
        chain.logs.push((
            event_topic(SIG_DONATION_RECEIVED),
            donation_log(945, 1, &donor, &usdc, 60_000_000),
        ));
        // Unrecognized asset → null USD, total unchanged.
        chain.logs.push((
            event_topic(SIG_DONATION_RECEIVED),
            donation_log(950, 2, &donor, &unknown, 999),
        ));

        let config = IndexerConfig {
            confirmations: 20,
            lookback: 50,
            treasury_vault: Some(vault()),
            stablecoin_address: Some(usdc.clone()),
            donor_avatar_threshold_usd: 100.0,
            ..IndexerConfig::default()
        };
        let indexer = Indexer::new(store.clone(), Arc::new(chain), config);
        let report = indexer.sync_once().await.unwrap();
        assert_eq!(report.treasury.unwrap().donations_recorded, 3);

        let total = store.get_donor_total(&donor).await.unwrap().unwrap();
        assert!((total.total_usd - 110.0).abs() < 1e-9);
        assert!(total.first_event_id.is_some());

        // Crossing $100 flipped the profile, one-way.
        let profile = store.get_profile(&donor).await.unwrap().unwrap();
        assert_eq!(profile.avatar_mode, AvatarMode::Donor);
    }

    #[tokio::test]
    async fn test_donor_total_not_double_counted_on_rescan() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let donor = Address::new("0x4444444444444444444444444444444444444444");

        let mut chain = MockChain::new(8453, 1000);
        chain.logs.push((
            event_topic(SIG_DONATION_RECEIVED),
            donation_log(940, 0, &donor, &Address::zero(), 20_000_000_000_000_000),
        ));

        let config = IndexerConfig {
            confirmations: 20,
            lookback: 50,
            treasury_vault: Some(vault()),
            ..IndexerConfig::default()
        };
        let indexer = Indexer::new(store.clone(), Arc::new(chain), config);
        indexer.sync_once().await.unwrap();

        let key = cursor_key(TREASURY_VAULT_SOURCE, 8453, &vault());
        store.set_cursor(&key, 930).await.unwrap();
        indexer.sync_once().await.unwrap();

        let total = store.get_donor_total(&donor).await.unwrap().unwrap();
        assert!((total.total_usd - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_aborts_without_cursor_advance() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let chain = MockChain::new(1, 1000);

        let config = IndexerConfig {
            expected_chain_id: Some(8453),
            stake_vault: Some(vault()),
            ..IndexerConfig::default()
        };
        let indexer = Indexer::new(store.clone(), Arc::new(chain), config);

        let err = indexer.sync_once().await.unwrap_err();
        assert!(matches!(err, IndexerError::ChainIdMismatch { .. }));

        let key = cursor_key(STAKE_VAULT_SOURCE, 1, &vault());
        assert!(store.get_cursor(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_caught_up_source_is_noop() {
        let store: Arc<dyn LedgerStore> = Arc::new(MemoryBackend::new());
        let chain = MockChain::new(8453, 1000);

        let key = cursor_key(STAKE_VAULT_SOURCE, 8453, &vault());
        store.set_cursor(&key, 981).await.unwrap();

        let indexer = Indexer::new(store.clone(), Arc::new(chain), stake_config());
        let report = indexer.sync_once().await.unwrap();

        let stake_report = report.stake.unwrap();
        assert_eq!(stake_report.touched_agents, 0);
        // Cursor untouched by the no-op cycle.
        assert_eq!(store.get_cursor(&key).await.unwrap(), Some(981));
    }
}
