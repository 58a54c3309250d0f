use crate::id::{AnchorBatchId, JobId};
use crate::onchain::ChainRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-per-job snapshot anchoring record.
///
/// Created lazily at or after closure. The receipt is the only part that may
/// change after creation; root, salt and uri are frozen at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorBatch {
    pub id: AnchorBatchId,
    pub job_id: JobId,
    pub schema_version: u32,
    /// 0x-prefixed hex of 32 random bytes.
    pub salt: String,
    /// 0x-prefixed hex SHA-256 of the canonical snapshot bytes.
    pub anchor_root: String,
    /// Stable location of the canonical snapshot document.
    pub anchor_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ChainRef>,
    pub created_at: DateTime<Utc>,
}

impl AnchorBatch {
    pub fn new(
        job_id: JobId,
        schema_version: u32,
        salt: String,
        anchor_root: String,
        anchor_uri: String,
    ) -> Self {
        Self {
            id: AnchorBatchId::generate(),
            job_id,
            schema_version,
            salt,
            anchor_root,
            anchor_uri,
            receipt: None,
            created_at: Utc::now(),
        }
    }
}
