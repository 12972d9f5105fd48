use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

/// File-backed record store: one JSON document per named collection, each a
/// mapping from user email to that collection's records.
///
/// Writes replace the whole document via a temp file and rename, so readers
/// never observe a truncated file. Read-modify-write cycles must hold the
/// collection guard across both the load and the save.
pub struct JsonStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create data dir {}", self.dir.display()))?;
        Ok(())
    }

    fn path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    /// Serializes writers of one collection. Concurrent writers to the same
    /// file would otherwise race and drop updates (last-write-wins on the
    /// whole document).
    pub async fn guard(&self, collection: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(collection.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Loads a collection. A missing, unreadable, or malformed file yields
    /// an empty mapping so a damaged collection never takes requests down.
    pub async fn load<T>(&self, collection: &str) -> HashMap<String, T>
    where
        T: DeserializeOwned,
    {
        let path = self.path(collection);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(collection, error = %e, "failed to read collection");
                return HashMap::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                warn!(collection, error = %e, "malformed collection file, treating as empty");
                HashMap::new()
            }
        }
    }

    /// Replaces a collection document atomically.
    pub async fn save<T>(&self, collection: &str, data: &HashMap<String, T>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let path = self.path(collection);
        let tmp = self.dir.join(format!("{collection}.json.tmp"));
        let bytes =
            serde_json::to_vec_pretty(data).with_context(|| format!("serialize {collection}"))?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }
}
