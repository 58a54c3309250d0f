use anyhow::Result;
use curia_indexer::IndexerConfig;
use curia_types::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuriaConfig {
    pub storage: StorageSettings,
    pub governance: GovernanceSettings,
    pub economics: EconomicsSettings,
    pub anchor: AnchorSettings,
    pub indexer: IndexerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// "memory" or "rocks".
    pub backend: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSettings {
    pub min_stake_usdc: f64,
    pub min_rep_score_to_vote: f64,
    pub final_vote_window_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicsSettings {
    pub rewards_enabled: bool,
    pub agr_mint_per_win: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSettings {
    pub schema_version: u32,
    pub base_url: String,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSettings {
    pub enabled: bool,
    pub rpc_url: String,
    pub expected_chain_id: Option<u64>,
    pub confirmations: u64,
    pub lookback: u64,
    pub batch_size: u64,
    pub poll_seconds: u64,
    pub stake_vault: Option<String>,
    pub treasury_vault: Option<String>,
    pub stablecoin_address: Option<String>,
    pub native_usd_rate: f64,
    pub donor_avatar_threshold_usd: f64,
}

impl Default for CuriaConfig {
    fn default() -> Self {
        Self {
            storage: StorageSettings {
                backend: "memory".to_string(),
                path: PathBuf::from("./data/ledger"),
            },
            governance: GovernanceSettings {
                min_stake_usdc: 10.0,
                min_rep_score_to_vote: 10.0,
                final_vote_window_hours: 72,
            },
            economics: EconomicsSettings {
                rewards_enabled: true,
                agr_mint_per_win: 50,
            },
            anchor: AnchorSettings {
                schema_version: 1,
                base_url: "http://localhost:8000".to_string(),
                snapshot_dir: PathBuf::from("./data/anchors"),
            },
            indexer: IndexerSettings {
                enabled: false,
                rpc_url: String::new(),
                expected_chain_id: None,
                confirmations: 20,
                lookback: 2000,
                batch_size: 2000,
                poll_seconds: 5,
                stake_vault: None,
                treasury_vault: None,
                stablecoin_address: None,
                native_usd_rate: 2500.0,
                donor_avatar_threshold_usd: 100.0,
            },
        }
    }
}

impl CuriaConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Typed reconciler parameters from the `[indexer]` section.
    pub fn indexer_config(&self) -> IndexerConfig {
        let to_address = |raw: &Option<String>| raw.as_deref().map(Address::new);

        IndexerConfig {
            expected_chain_id: self.indexer.expected_chain_id,
            confirmations: self.indexer.confirmations,
            lookback: self.indexer.lookback,
            batch_size: self.indexer.batch_size,
            poll_interval: Duration::from_secs(self.indexer.poll_seconds.max(1)),
            stake_vault: to_address(&self.indexer.stake_vault),
            treasury_vault: to_address(&self.indexer.treasury_vault),
            stablecoin_address: to_address(&self.indexer.stablecoin_address),
            native_usd_rate: self.indexer.native_usd_rate,
            donor_avatar_threshold_usd: self.indexer.donor_avatar_threshold_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curia.toml");

        let mut config = CuriaConfig::default();
        config.indexer.enabled = true;
        config.indexer.rpc_url = "http://localhost:8545".to_string();
        config.indexer.stake_vault =
            Some("0x00000000000000000000000000000000000000aa".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = CuriaConfig::from_file(&path).unwrap();
        assert!(loaded.indexer.enabled);
        assert_eq!(loaded.indexer.rpc_url, "http://localhost:8545");
        assert_eq!(loaded.storage.backend, "memory");
    }

    #[test]
    fn test_indexer_config_conversion() {
        let mut config = CuriaConfig::default();
        config.indexer.stake_vault =
            Some("0x00000000000000000000000000000000000000AA".to_string());
        config.indexer.poll_seconds = 0;

        let indexer = config.indexer_config();
        // Addresses are normalized, poll interval has a floor of one second.
        assert_eq!(
            indexer.stake_vault.unwrap().as_str(),
            "0x00000000000000000000000000000000000000aa"
        );
        assert_eq!(indexer.poll_interval, Duration::from_secs(1));
        assert_eq!(indexer.confirmations, 20);
    }
}
