use crate::address::Address;
use crate::id::{JobId, SubmissionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured evidence item attached to a submission: a claim, the quote
/// supporting it, and where the quote was retrieved from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Work submitted against an open job. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub job_id: JobId,
    pub author_address: Address,
    pub content: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        job_id: JobId,
        author_address: Address,
        content: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Self {
        Self {
            id: SubmissionId::generate(),
            job_id,
            author_address,
            content: content.into(),
            evidence,
            created_at: Utc::now(),
        }
    }
}
