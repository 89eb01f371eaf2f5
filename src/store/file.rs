use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{NewSession, SessionRecord, SessionStore, SessionUpdate, StoreError};

/// Stores each record as `<session_id>.json` in a directory
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write updates
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create session store directory")?;

        info!("Session store at {}", dir.display());

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Ids are generated UUIDs; anything else cannot name a record
    fn record_path(&self, session_id: &str) -> Option<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| self.dir.join(format!("{}.json", session_id)))
    }

    async fn read_record(path: &Path) -> Result<Option<SessionRecord>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn write_record(path: &Path, record: &SessionRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Replace atomically via rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn create_session(&self, new: NewSession) -> Result<SessionRecord, StoreError> {
        let record = SessionRecord::new(new);
        let path = self
            .record_path(&record.session_id)
            .ok_or_else(|| StoreError::Io("invalid session id".to_string()))?;

        let _guard = self.write_lock.lock().await;
        Self::write_record(&path, &record).await?;
        Ok(record)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self.record_path(session_id) {
            Some(path) => Self::read_record(&path).await,
            None => Ok(None),
        }
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<(), StoreError> {
        let path = self
            .record_path(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        let _guard = self.write_lock.lock().await;
        let mut record = Self::read_record(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        record.apply(update)?;
        Self::write_record(&path, &record).await
    }

    async fn list_sessions(&self, created_by: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let mut mine = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) if record.created_by.as_deref() == Some(created_by) => {
                    mine.push(record)
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        mine.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(mine)
    }
}
