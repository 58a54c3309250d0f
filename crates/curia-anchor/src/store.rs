use crate::error::{AnchorError, Result};
use async_trait::async_trait;
use curia_types::JobId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Content-addressed persistence for canonical snapshot documents, keyed by
/// job id. Returns the stable URI the anchor batch will carry.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put_snapshot(&self, job_id: &JobId, bytes: &[u8]) -> Result<String>;

    async fn get_snapshot(&self, job_id: &JobId) -> Result<Option<Vec<u8>>>;
}

/// Writes snapshots under a static directory served at `<base_url>/anchors/`.
pub struct FsSnapshotStore {
    dir: PathBuf,
    base_url: String,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn put_snapshot(&self, job_id: &JobId, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AnchorError::SnapshotStore(e.to_string()))?;

        let path = self.path_for(job_id);
        let mut data = bytes.to_vec();
        data.push(b'\n');
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AnchorError::SnapshotStore(e.to_string()))?;

        let uri = format!("{}/anchors/{}.json", self.base_url, job_id);
        info!(job_id = %job_id, uri = %uri, "Snapshot written");
        Ok(uri)
    }

    async fn get_snapshot(&self, job_id: &JobId) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(job_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AnchorError::SnapshotStore(e.to_string())),
        }
    }
}

/// In-memory snapshot store for tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<JobId, Vec<u8>>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put_snapshot(&self, job_id: &JobId, bytes: &[u8]) -> Result<String> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(job_id.clone(), bytes.to_vec());
        Ok(format!("mem://anchors/{}.json", job_id))
    }

    async fn get_snapshot(&self, job_id: &JobId) -> Result<Option<Vec<u8>>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(job_id).cloned())
    }
}
