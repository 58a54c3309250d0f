use curia_storage::LedgerError;
use curia_types::canonical_json::CanonicalJsonError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnchorError>;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("No anchor batch exists for job {0}")]
    BatchMissing(String),

    #[error("Invalid hex value: {0}")]
    InvalidHex(String),

    #[error("Snapshot store error: {0}")]
    SnapshotStore(String),

    #[error("Canonicalization error: {0}")]
    Canonical(#[from] CanonicalJsonError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
