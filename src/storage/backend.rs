use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use parking_lot::RwLock;
use crate::core::config::StorageKind;
use crate::core::error::{Error, Result};
use crate::storage::file::FileStorage;

/// Key-value persistence boundary. Every failure is reported as a storage error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn store(&self, key: &str, data: &[u8]) -> Result<()>;

    /// `None` when nothing is stored under `key`
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn clear(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Build the adapter selected by configuration
pub fn open_storage(kind: &StorageKind) -> Result<Arc<dyn StorageBackend>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageKind::Filesystem { path } => Ok(Arc::new(FileStorage::new(path.clone())?)),
    }
}

/// Keys become file names, so they are limited to a portable character set
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::storage(format!("Invalid storage key '{}'", key)))
    }
}

/// Process-local storage, lost on drop
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::storage("Memory storage is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[tokio::test]
    async fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.store("index", b"bytes").await.unwrap();
        assert_eq!(storage.retrieve("index").await.unwrap(), Some(b"bytes".to_vec()));
        assert_eq!(storage.retrieve("other").await.unwrap(), None);

        storage.clear().await.unwrap();
        assert_eq!(storage.retrieve("index").await.unwrap(), None);
    }

    #[tokio::test]
    async fn closed_storage_refuses_work() {
        let storage = MemoryStorage::new();
        storage.close().await.unwrap();
        let err = storage.store("index", b"bytes").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn keys_are_restricted() {
        assert!(validate_key("index-v1.snapshot").is_ok());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
    }
}
