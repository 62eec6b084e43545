use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use tokio::fs;
use crate::core::error::{Error, Result};
use crate::storage::backend::{validate_key, StorageBackend};

const DATA_EXTENSION: &str = "bin";
const TEMP_EXTENSION: &str = "tmp";

/// One file per key under a base directory.
/// Writes go to a temp file that is renamed into place, so readers never see a torn value.
pub struct FileStorage {
    pub base_dir: PathBuf,
    closed: AtomicBool,
}

impl FileStorage {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| Error::storage(format!("Cannot create {}: {}", base_dir.display(), e)))?;

        Ok(FileStorage {
            base_dir,
            closed: AtomicBool::new(false),
        })
    }

    pub fn data_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", key, DATA_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.{}", key, TEMP_EXTENSION))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::storage(format!("Storage at {} is closed", self.base_dir.display())));
        }
        Ok(())
    }
}

fn storage_error(operation: &str, key: &str, err: std::io::Error) -> Error {
    Error::storage(format!("{} '{}' failed: {}", operation, key, err))
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        validate_key(key)?;

        let temp = self.temp_path(key);
        fs::write(&temp, data).await.map_err(|e| storage_error("store", key, e))?;
        fs::rename(&temp, self.data_path(key)).await.map_err(|e| storage_error("store", key, e))?;
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        validate_key(key)?;

        match fs::read(self.data_path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("retrieve", key, e)),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_open()?;

        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| storage_error("clear", "*", e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| storage_error("clear", "*", e))? {
            let path = entry.path();
            let ours = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == DATA_EXTENSION || ext == TEMP_EXTENSION);
            if ours {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| storage_error("clear", &path.display().to_string(), e))?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
