//! JSON file key-value storage.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use claw_master_core::traits::{KeyValueStore, StorageError};
use serde_json::Value;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

/// File-backed storage holding every key in one JSON object.
///
/// The file is read once on open. Each save/remove rewrites it through a
/// temporary file and an atomic rename, so a crash never leaves a
/// half-written document behind.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or empty file opens empty.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a JSON object.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened storage file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, entries: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.temp_path()?;

        let mut tmp_file = fs::File::create(&tmp_path).await?;
        tmp_file.write_all(&json).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf, StorageError> {
        let file_name = self.path.file_name().ok_or_else(|| {
            StorageError::Internal(format!("no file name in {}", self.path.display()))
        })?;
        Ok(self
            .path
            .with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.save("moltbook.activeIdentityId", json!("id-1")).await.unwrap();
        store.save("clawnews.agentRuntimeEnabled", json!(true)).await.unwrap();
        store.remove("clawnews.agentRuntimeEnabled").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.load("moltbook.activeIdentityId").await.unwrap(),
            Some(json!("id-1"))
        );
        assert_eq!(reopened.load("clawnews.agentRuntimeEnabled").await.unwrap(), None);
        assert!(!dir.path().join("nested").join(".storage.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "  \n").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.load("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StorageError::Serialization(_))
        ));
    }
}
