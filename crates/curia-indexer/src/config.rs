use curia_types::Address;
use std::time::Duration;

/// Reconciliation parameters, fixed at construction.
///
/// Everything the poll algorithm depends on lives here so cycles are fully
/// testable without process environment setup.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Abort a cycle when the endpoint reports a different chain.
    pub expected_chain_id: Option<u64>,
    /// Blocks held back from `latest` before a block is considered final.
    pub confirmations: u64,
    /// Cold-start scan depth when a source has no cursor yet.
    pub lookback: u64,
    /// Maximum blocks consumed per source per cycle.
    pub batch_size: u64,
    /// Sleep between cycles in loop mode.
    pub poll_interval: Duration,

    pub stake_vault: Option<Address>,
    pub treasury_vault: Option<Address>,

    /// Recognized stablecoin; donations in it divide by 10^6 for the USD
    /// estimate.
    pub stablecoin_address: Option<Address>,
    /// Fixed exchange rate applied to native-asset donations.
    pub native_usd_rate: f64,
    /// Cumulative USD at which a donor's profile flips to the donor avatar.
    pub donor_avatar_threshold_usd: f64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            expected_chain_id: None,
            confirmations: 20,
            lookback: 2000,
            batch_size: 2000,
            poll_interval: Duration::from_secs(5),
            stake_vault: None,
            treasury_vault: None,
            stablecoin_address: None,
            native_usd_rate: 2500.0,
            donor_avatar_threshold_usd: 100.0,
        }
    }
}
