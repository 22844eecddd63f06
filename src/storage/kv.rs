//! Key-value persistence, the same contract the mobile client's storage had.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;

use crate::error::StorageError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Each `set` replaces the value as a whole; readers never see a partial
    /// write.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove all `keys`. Missing keys are not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Process-local store, mostly for tests and one-off runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Corrupt("memory store lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// All keys in one JSON object on disk.
///
/// Writes go to a sibling temp file that is then renamed over the original,
/// so a concurrent reader sees either the old or the new map.
pub struct FileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|err| StorageError::Corrupt(format!("{}: {err}", self.path.display())))
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value);
        self.write_map(&map).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_map(&map).await
    }
}
