use curia_storage::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Chain id mismatch: expected {expected}, endpoint reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("Event decode error: {0}")]
    Decode(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
