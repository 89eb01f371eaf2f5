//! Visit report generation
//!
//! After a call leaves Active, the finalized transcript and session metadata
//! are sent to a summarization service. A well-formed answer is stored with
//! the session record; anything else is reported back without failing the
//! session.

mod requestor;
mod summarizer;

pub use requestor::{parse_report, ReportRequestor};
pub use summarizer::{CompletionSummarizer, SummarizationService};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{ConversationMessage, Session, TranscriptEntry};
use crate::specialist::Specialist;

/// Structured visit report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub timestamp: String,
    pub chief_complaint: String,
    pub summary: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub medications_mentioned: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Everything the summarizer is given for one session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub session_id: String,
    pub specialist: Specialist,
    pub started_at: Option<DateTime<Utc>>,
    pub requested_at: DateTime<Utc>,
    pub conversation: Vec<ConversationMessage>,
}

impl ReportRequest {
    pub fn new(session: &Session, transcript: &[TranscriptEntry]) -> Self {
        Self {
            session_id: session.session_id.clone(),
            specialist: session.specialist.clone(),
            started_at: session.started_at,
            requested_at: Utc::now(),
            conversation: transcript.iter().map(ConversationMessage::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReportError {
    #[error("summarization service failed: {0}")]
    Service(String),

    #[error("summarization response was malformed: {0}")]
    Malformed(String),

    #[error("summarization timed out after {secs}s")]
    TimedOut { secs: u64 },
}

/// Result of the single report generation attempt for a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Stored { report: MedicalReport },
    /// Generated, but the store rejected the write
    NotStored { report: MedicalReport, error: String },
    Failed { error: ReportError },
}

impl ReportOutcome {
    pub fn report(&self) -> Option<&MedicalReport> {
        match self {
            ReportOutcome::Stored { report } | ReportOutcome::NotStored { report, .. } => {
                Some(report)
            }
            ReportOutcome::Failed { .. } => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, ReportOutcome::Stored { .. })
    }

    pub fn status(&self) -> ReportStatus {
        match self {
            ReportOutcome::Stored { .. } => ReportStatus::Stored,
            ReportOutcome::NotStored { .. } => ReportStatus::NotStored,
            ReportOutcome::Failed { .. } => ReportStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Stored,
    NotStored,
    Failed,
}
