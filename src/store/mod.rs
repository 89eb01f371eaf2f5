//! Session-chart persistence
//!
//! A record is created when a patient starts a consultation and updated once,
//! when its report is accepted. The session id is the only lookup key.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::report::MedicalReport;
use crate::session::ConversationMessage;
use crate::specialist::Specialist;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub notes: String,
    pub selected_doctor: Specialist,
    pub conversation: Option<Vec<ConversationMessage>>,
    pub report: Option<MedicalReport>,
    pub created_by: Option<String>,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub notes: String,
    pub selected_doctor: Specialist,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub report: MedicalReport,
    pub conversation: Vec<ConversationMessage>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {0} already has an accepted report")]
    ReportAlreadyStored(String),

    #[error("storage IO error: {0}")]
    Io(String),

    #[error("stored record is unreadable: {0}")]
    Serialization(String),
}

impl SessionRecord {
    pub fn new(new: NewSession) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            notes: new.notes,
            selected_doctor: new.selected_doctor,
            conversation: None,
            report: None,
            created_by: new.created_by,
            created_on: Utc::now(),
        }
    }

    /// Accepted reports are final
    fn apply(&mut self, update: SessionUpdate) -> Result<(), StoreError> {
        if self.report.is_some() {
            return Err(StoreError::ReportAlreadyStored(self.session_id.clone()));
        }
        self.report = Some(update.report);
        self.conversation = Some(update.conversation);
        Ok(())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> Result<SessionRecord, StoreError>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Attach the report and conversation; refused once a report is stored
    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<(), StoreError>;

    /// Records created by `created_by`, newest first
    async fn list_sessions(&self, created_by: &str) -> Result<Vec<SessionRecord>, StoreError>;
}

/// Open the store selected by configuration
pub fn open(cfg: &StoreConfig) -> Result<Arc<dyn SessionStore>> {
    match cfg {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::File { path } => Ok(Arc::new(JsonFileStore::open(path)?)),
    }
}
