use super::{SessionStore, SessionStoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A `SessionStore` persisted as a single JSON object in one file.
///
/// This is the native analogue of browser local storage: the whole map is
/// rewritten on every `set`/`remove`, last writer wins. Two processes
/// sharing a file are not coordinated, which matches the accepted
/// multiple-tabs limitation.
pub struct JsonFileSessionStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileSessionStore {
    /// Opens (or creates) the store at `path`, loading any existing entries.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SessionStoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SessionStoreError::Codec(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(SessionStoreError::Io(e.to_string())),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<(), SessionStoreError> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| SessionStoreError::Codec(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SessionStoreError::Io(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), SessionStoreError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = JsonFileSessionStore::open(&path).await.unwrap();
        store.set("deploymentId", "d1").await.unwrap();
        store.set("deployed", "true").await.unwrap();
        store.remove("deployed").await.unwrap();
        drop(store);

        let reopened = JsonFileSessionStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("deploymentId").await.unwrap().as_deref(),
            Some("d1")
        );
        assert!(reopened.get("deployed").await.unwrap().is_none());
    }
}
