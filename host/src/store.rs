// Key-value storage in the manner of a browser's extension-local store.
// Flat string keys, JSON values, last write wins, no transactions.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared key-value store. Cheap to clone; all clones see one map.
///
/// Concurrent writers racing on a key get last-write-wins with no
/// conflict detection. Callers must tolerate interleaved updates.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    map: RwLock<HashMap<String, Value>>,
    /// Snapshot file rewritten after each mutation, best effort only.
    snapshot: Option<PathBuf>,
}

impl LocalStore {
    /// Purely in-memory store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                map: RwLock::new(HashMap::new()),
                snapshot: None,
            }),
        }
    }

    /// Store backed by a JSON snapshot file. An existing snapshot is
    /// loaded; a missing one starts the store empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read store snapshot: {}", path.display()))?;
            serde_json::from_str(&content).context("store snapshot is not a JSON object")?
        } else {
            HashMap::new()
        };

        Ok(Self {
            inner: Arc::new(StoreInner {
                map: RwLock::new(map),
                snapshot: Some(path),
            }),
        })
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.map.read().await.get(key).cloned()
    }

    /// Read a key into a typed value. Absent keys and values of the
    /// wrong shape both come back as `None`.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        serde_json::from_value(value).ok()
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.map.write().await.insert(key.into(), value);
        self.write_snapshot().await;
    }

    pub async fn set_typed<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).context("failed to encode store value")?;
        self.set(key, value).await;
        Ok(())
    }

    /// Write several keys under one lock acquisition, the multi-key
    /// `set` of the original storage API.
    pub async fn set_many(&self, entries: Vec<(String, Value)>) {
        {
            let mut map = self.inner.map.write().await;
            for (key, value) in entries {
                map.insert(key, value);
            }
        }
        self.write_snapshot().await;
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.map.write().await.remove(key);
        self.write_snapshot().await;
        removed
    }

    pub async fn clear(&self) {
        self.inner.map.write().await.clear();
        self.write_snapshot().await;
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.map.read().await.keys().cloned().collect()
    }

    /// Persistence is capped at last-write-wins: a failed snapshot write
    /// is logged and the in-memory state stays authoritative.
    async fn write_snapshot(&self) {
        let path = match &self.inner.snapshot {
            Some(path) => path,
            None => return,
        };
        let content = {
            let map = self.inner.map.read().await;
            match serde_json::to_string_pretty(&*map) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("failed to encode store snapshot: {}", e);
                    return;
                }
            }
        };
        if let Err(e) = tokio::fs::write(path, content).await {
            tracing::warn!("failed to write store snapshot {}: {}", path.display(), e);
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}
