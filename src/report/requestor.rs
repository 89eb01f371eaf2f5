use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{MedicalReport, ReportError, ReportOutcome, ReportRequest, SummarizationService};
use crate::ai::strip_code_fences;
use crate::session::{Session, TranscriptEntry};
use crate::store::{SessionStore, SessionUpdate};

/// Validate a raw summarizer answer for `session_id`
///
/// The answer must be a JSON object carrying at least `chiefComplaint` and
/// `summary`. The session id is always taken from the session, not the model.
pub fn parse_report(raw: &str, session_id: &str) -> Result<MedicalReport, ReportError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(ReportError::Malformed("empty response".to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ReportError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(ReportError::Malformed("expected a JSON object".to_string()));
    }

    let mut report: MedicalReport =
        serde_json::from_value(value).map_err(|e| ReportError::Malformed(e.to_string()))?;
    report.session_id = session_id.to_string();

    Ok(report)
}

/// Generates and stores the report for a finished session; one attempt, no retry
pub struct ReportRequestor {
    summarizer: Arc<dyn SummarizationService>,
    store: Arc<dyn SessionStore>,
    timeout: Option<Duration>,
}

impl ReportRequestor {
    pub fn new(
        summarizer: Arc<dyn SummarizationService>,
        store: Arc<dyn SessionStore>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            summarizer,
            store,
            timeout,
        }
    }

    pub async fn generate(
        &self,
        session: &Session,
        transcript: &[TranscriptEntry],
    ) -> ReportOutcome {
        let request = ReportRequest::new(session, transcript);
        info!(
            "Generating report for session {} ({} transcript entries)",
            session.session_id,
            request.conversation.len()
        );

        let call = self.summarizer.summarize(&request);
        let answer = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!("Report generation timed out for session {}", session.session_id);
                    return ReportOutcome::Failed {
                        error: ReportError::TimedOut {
                            secs: limit.as_secs(),
                        },
                    };
                }
            },
            None => call.await,
        };

        let raw = match answer {
            Ok(raw) => raw,
            Err(e) => {
                error!("Summarization failed for session {}: {}", session.session_id, e);
                return ReportOutcome::Failed {
                    error: ReportError::Service(e.to_string()),
                };
            }
        };

        let report = match parse_report(&raw, &session.session_id) {
            Ok(report) => report,
            Err(e) => {
                warn!("Rejected report for session {}: {}", session.session_id, e);
                return ReportOutcome::Failed { error: e };
            }
        };

        let update = SessionUpdate {
            report: report.clone(),
            conversation: request.conversation,
        };

        match self.store.update_session(&session.session_id, update).await {
            Ok(()) => {
                info!("Report stored for session {}", session.session_id);
                ReportOutcome::Stored { report }
            }
            Err(e) => {
                error!("Failed to store report for session {}: {}", session.session_id, e);
                ReportOutcome::NotStored {
                    report,
                    error: e.to_string(),
                }
            }
        }
    }
}
