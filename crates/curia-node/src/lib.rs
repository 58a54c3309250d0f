pub mod config;
pub mod logging;

pub use config::CuriaConfig;

use anyhow::Result;
use curia_storage::{LedgerStore, MemoryBackend, RocksBackend};
use std::sync::Arc;

/// Select the ledger backend at process start. Core logic is identical
/// against either one.
pub fn build_store(config: &CuriaConfig) -> Result<Arc<dyn LedgerStore>> {
    match config.storage.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryBackend::new())),
        "rocks" => Ok(Arc::new(RocksBackend::new(&config.storage.path)?)),
        other => anyhow::bail!("unknown storage backend '{}'", other),
    }
}
