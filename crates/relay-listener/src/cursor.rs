//! Cursor persistence.
//!
//! The durable key-value store is an external collaborator; the recorder is
//! the thin adapter that writes the last processed sequence number under a
//! fixed key and reads it back when (re)establishing the connection.

use crate::error::{ListenerError, ListenerResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Fixed storage key for the cursor.
pub const DEFAULT_CURSOR_KEY: &str = "seq";

/// The durable key-value storage seam.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Store a value. Must be crash-durable before returning `Ok`.
    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Retrieve a value.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Persists the cursor as a decimal string under a fixed key.
pub struct CursorRecorder {
    store: Arc<dyn CursorStore>,
    key: String,
}

impl CursorRecorder {
    pub fn new(store: Arc<dyn CursorStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Write the sequence number unconditionally. No read-modify-write and
    /// no ordering check against the previous value: an out-of-order frame
    /// silently overwrites to a lower cursor.
    pub async fn save(&self, seq: u64) -> ListenerResult<()> {
        self.store
            .put(&self.key, &seq.to_string())
            .await
            .map_err(|e| ListenerError::Storage(format!("{e:#}")))?;

        debug!(seq, key = %self.key, "Persisted cursor");
        Ok(())
    }

    /// Read the stored cursor back, if any. A value that does not parse as
    /// a sequence number is treated as absent.
    pub async fn load(&self) -> ListenerResult<Option<u64>> {
        let raw = self
            .store
            .get(&self.key)
            .await
            .map_err(|e| ListenerError::Storage(format!("{e:#}")))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match raw.parse::<u64>() {
            Ok(seq) => Ok(Some(seq)),
            Err(_) => {
                warn!(value = %raw, key = %self.key, "Stored cursor is not a number, ignoring");
                Ok(None)
            }
        }
    }
}

/// Single-directory file store: each key is one file, written via a temp
/// file, fsync, and atomic rename.
pub struct FileCursorStore {
    dir: PathBuf,
}

impl FileCursorStore {
    /// Create the store, creating the backing directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> ListenerResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let final_path = self.dir.join(key);
        let tmp_path = self.dir.join(format!("{key}.tmp"));

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match tokio::fs::read_to_string(self.dir.join(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_put_get() {
        let dir = TempDir::new().unwrap();
        let store = FileCursorStore::new(dir.path()).await.unwrap();

        assert_eq!(store.get("seq").await.unwrap(), None);

        store.put("seq", "42").await.unwrap();
        assert_eq!(store.get("seq").await.unwrap(), Some("42".to_string()));

        // Overwrite is unconditional
        store.put("seq", "7").await.unwrap();
        assert_eq!(store.get("seq").await.unwrap(), Some("7".to_string()));
    }

    #[tokio::test]
    async fn test_recorder_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileCursorStore::new(dir.path()).await.unwrap());
        let recorder = CursorRecorder::new(store, DEFAULT_CURSOR_KEY);

        assert_eq!(recorder.load().await.unwrap(), None);

        recorder.save(1023143536).await.unwrap();
        assert_eq!(recorder.load().await.unwrap(), Some(1023143536));
    }

    #[tokio::test]
    async fn test_recorder_ignores_unparsable_cursor() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileCursorStore::new(dir.path()).await.unwrap());

        store.put("seq", "not-a-number").await.unwrap();

        let recorder = CursorRecorder::new(store, "seq");
        assert_eq!(recorder.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_recorder_overwrites_to_lower_value() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileCursorStore::new(dir.path()).await.unwrap());
        let recorder = CursorRecorder::new(store, "seq");

        recorder.save(100).await.unwrap();
        recorder.save(50).await.unwrap();
        assert_eq!(recorder.load().await.unwrap(), Some(50));
    }
}
