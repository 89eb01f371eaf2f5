use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{ErrorInfo, LifecycleState};
use super::transcript::LiveUtterance;
use crate::report::ReportStatus;

/// Point-in-time view of a consultation, published to observers on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,

    pub state: LifecycleState,

    /// Selected specialist id and display name, once connected
    pub specialist_id: Option<u32>,
    pub specialist: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Call duration so far (or total, once ended)
    pub duration_secs: Option<f64>,

    pub retry_attempt: u32,

    /// Present only when the session Failed
    pub error: Option<ErrorInfo>,

    pub agent_speaking: bool,

    /// Number of finalized transcript entries
    pub transcript_entries: usize,

    pub live: Vec<LiveUtterance>,

    pub report: Option<ReportStatus>,
}

impl SessionStatus {
    pub fn idle(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: LifecycleState::Idle,
            specialist_id: None,
            specialist: None,
            started_at: None,
            ended_at: None,
            duration_secs: None,
            retry_attempt: 0,
            error: None,
            agent_speaking: false,
            transcript_entries: 0,
            live: Vec::new(),
            report: None,
        }
    }
}
