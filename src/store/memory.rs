use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{NewSession, SessionRecord, SessionStore, SessionUpdate, StoreError};

/// Process-local store; records are lost on restart
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, new: NewSession) -> Result<SessionRecord, StoreError> {
        let record = SessionRecord::new(new);
        let mut records = self.records.write().await;
        records.insert(record.session_id.clone(), record.clone());
        Ok(record)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned())
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        record.apply(update)
    }

    async fn list_sessions(&self, created_by: &str) -> Result<Vec<SessionRecord>, StoreError> {
        let records = self.records.read().await;
        let mut mine: Vec<SessionRecord> = records
            .values()
            .filter(|r| r.created_by.as_deref() == Some(created_by))
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        Ok(mine)
    }
}
