use crate::address::Address;
use crate::id::CommentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentTarget {
    Job,
    Submission,
}

/// Discussion comment on a job or submission. The comment CRUD surface lives
/// outside this core; the snapshot builder folds these rows into a job's
/// anchored history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub target: CommentTarget,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub author_address: Address,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        target: CommentTarget,
        target_id: impl Into<String>,
        author_address: Address,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: CommentId::generate(),
            target,
            target_id: target_id.into(),
            parent_id: None,
            author_address,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// How a profile's avatar is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarMode {
    Manual,
    /// System-driven, one-way: set by the indexer once a donor's cumulative
    /// USD total crosses the configured threshold. Users cannot opt in.
    Donor,
}

/// Minimal profile surface this core touches: the avatar mode flipped by the
/// donor-total aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub address: Address,
    pub avatar_mode: AvatarMode,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            avatar_mode: AvatarMode::Manual,
            updated_at: Utc::now(),
        }
    }
}
