use curia_storage::LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EconomicsError>;

#[derive(Debug, Error)]
pub enum EconomicsError {
    #[error("Insufficient AGR balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
