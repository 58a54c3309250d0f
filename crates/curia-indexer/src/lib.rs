pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod sync;

pub use client::{ChainClient, EventLog, HttpRpcClient};
pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use sync::{Indexer, StakeSyncReport, SyncReport, TreasurySyncReport};
