use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chromlm_error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// Directory of named JSON records, one file per record.
///
/// Every write replaces the whole record: the new content is written to a
/// temp file next to the target, fsynced, and renamed over it. A reader sees
/// either the previous record or the new one, never a partial write.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: Arc<PathBuf>,
}

impl LocalStore {
    /// Opens (creating if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| Error::storage("create_dir", &dir, e))?;
        Ok(Self { dir: Arc::new(dir) })
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reads record `key`, or `None` when it has never been written.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.record_path(key);
        let key = key.to_string();
        run_blocking(move || {
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(Error::storage("read", &path, e)),
            };
            serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::Serialization {
                    key,
                    action: "decoded",
                    message: e.to_string(),
                })
        })
        .await
    }

    /// Replaces record `key` with `value`.
    #[instrument(skip(self, value), fields(dir = %self.dir.display()))]
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| Error::Serialization {
            key: key.to_string(),
            action: "encoded",
            message: e.to_string(),
        })?;
        let dir = Arc::clone(&self.dir);
        let path = self.record_path(key);
        let len = bytes.len();
        run_blocking(move || write_atomic(&dir, &path, &bytes)).await?;
        debug!(key, bytes = len, "record committed");
        Ok(())
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::storage("create_temp", dir, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::storage("write", path, e))?;
    tmp.persist(path)
        .map_err(|e| Error::storage("rename", path, e.error))?;
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| Error::Storage {
        operation: "join",
        path: PathBuf::new(),
        source: Arc::new(std::io::Error::other(e.to_string())),
    })?
}
