//! Durable per-project launch checkpoints
//!
//! A stored `CheckpointRecord` means phase 1 of the market launch committed
//! on-chain. Records are keyed by project id and never deleted here.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{LaunchpadError, Result};
use crate::types::CheckpointRecord;

const CHECKPOINT_TREE: &str = "launch_checkpoints";

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, project: &Pubkey) -> Result<Option<CheckpointRecord>>;

    /// Persist durably; returns only after the write is flushed
    async fn save(&self, project: &Pubkey, record: &CheckpointRecord) -> Result<()>;

    async fn list(&self) -> Result<Vec<(Pubkey, CheckpointRecord)>>;
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: RwLock<HashMap<Pubkey, CheckpointRecord>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, project: &Pubkey) -> Result<Option<CheckpointRecord>> {
        Ok(self.records.read().await.get(project).cloned())
    }

    async fn save(&self, project: &Pubkey, record: &CheckpointRecord) -> Result<()> {
        self.records.write().await.insert(*project, record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(Pubkey, CheckpointRecord)>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }
}

/// sled-backed store; values are the JSON form of `CheckpointRecord`
#[derive(Clone)]
pub struct SledCheckpointStore {
    tree: sled::Tree,
}

impl SledCheckpointStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        info!(path = %path.as_ref().display(), "Opening checkpoint store");
        let db = sled::open(path)?;
        let tree = db.open_tree(CHECKPOINT_TREE)?;
        Ok(Self { tree })
    }

    /// Run sled I/O on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(sled::Tree) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || op(tree))
            .await
            .map_err(|e| LaunchpadError::Storage(format!("checkpoint task: {e}")))?
    }
}

#[async_trait]
impl CheckpointStore for SledCheckpointStore {
    async fn load(&self, project: &Pubkey) -> Result<Option<CheckpointRecord>> {
        let key = project.to_string();
        self.blocking(move |tree| match tree.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        })
        .await
    }

    async fn save(&self, project: &Pubkey, record: &CheckpointRecord) -> Result<()> {
        let key = project.to_string();
        let value = serde_json::to_vec(record)?;
        self.blocking(move |tree| {
            tree.insert(key, value)?;
            Ok(())
        })
        .await?;
        let flushed = self.tree.flush_async().await?;
        debug!(%project, bytes = flushed, "Checkpoint flushed");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(Pubkey, CheckpointRecord)>> {
        self.blocking(|tree| {
            tree.iter()
                .map(|entry| {
                    let (key, value) = entry?;
                    let key = std::str::from_utf8(&key)
                        .map_err(|e| LaunchpadError::Storage(format!("checkpoint key: {e}")))?;
                    let project = Pubkey::from_str(key)
                        .map_err(|e| LaunchpadError::Storage(format!("checkpoint key {key}: {e}")))?;
                    Ok((project, serde_json::from_slice(&value)?))
                })
                .collect()
        })
        .await
    }
}
