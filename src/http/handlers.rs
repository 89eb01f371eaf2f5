use super::identity::CurrentUser;
use super::state::AppState;
use crate::report::{ReportOutcome, ReportStatus};
use crate::session::{LifecycleState, SessionError, SessionStatus, TranscriptSnapshot};
use crate::specialist::SuggestError;
use crate::store::{NewSession, SessionRecord, StoreError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub notes: String,
    pub selected_doctor_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChartQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub status: SessionStatus,
    pub report: ReportOutcome,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn session_error_response(err: SessionError) -> Response {
    let status = match err {
        SessionError::AlreadyInProgress(_) | SessionError::NotConnected(_) => {
            StatusCode::CONFLICT
        }
        SessionError::InvalidSpecialist(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::InvalidTransition { .. } | SessionError::DriverClosed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

fn suggest_error_message(err: &SuggestError) -> String {
    match err {
        SuggestError::Completion(e) => format!("Suggestion service unavailable: {}", e),
        SuggestError::Malformed(_) => {
            "Suggestion service returned an unreadable answer".to_string()
        }
    }
}

fn store_error_response(err: StoreError) -> Response {
    error!("Session store error: {}", err);
    match err {
        StoreError::NotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("Session {} not found", id))
        }
        conflict @ StoreError::ReportAlreadyStored(_) => {
            error_response(StatusCode::CONFLICT, conflict.to_string())
        }
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// Stored record for `session_id`, or the response to send instead
async fn load_record(state: &AppState, session_id: &str) -> Result<SessionRecord, Response> {
    match state.store.get_session(session_id).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        )),
        Err(e) => Err(store_error_response(e)),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/specialists
pub async fn list_specialists(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.catalog.all().to_vec()))
}

/// POST /api/suggest-doctors
/// Suggest up to three specialists for the patient's notes
pub async fn suggest_doctors(
    State(state): State<AppState>,
    Json(req): Json<SuggestRequest>,
) -> impl IntoResponse {
    match state.suggester.suggest(&req.notes).await {
        Ok(specialists) => (StatusCode::OK, Json(specialists)).into_response(),
        Err(e) => {
            error!("Specialist suggestion failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, suggest_error_message(&e))
        }
    }
}

/// POST /api/session-chart
/// Create the record for a new consultation
pub async fn create_session_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let Some(specialist) = state.catalog.get(req.selected_doctor_id).cloned() else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Unknown specialist {}", req.selected_doctor_id),
        );
    };

    let new = NewSession {
        notes: req.notes,
        selected_doctor: specialist,
        created_by: user,
    };

    match state.store.create_session(new).await {
        Ok(record) => {
            info!(
                "Created session {} with {}",
                record.session_id, record.selected_doctor.specialist
            );
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// GET /api/session-chart?sessionId=
/// One record, or the caller's history when no id is given
pub async fn get_session_chart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SessionChartQuery>,
) -> impl IntoResponse {
    if let Some(session_id) = query.session_id {
        return match load_record(&state, &session_id).await {
            Ok(record) => (StatusCode::OK, Json(record)).into_response(),
            Err(response) => response,
        };
    }

    let Some(user) = user else {
        return (StatusCode::OK, Json(Vec::<SessionRecord>::new())).into_response();
    };

    match state.store.list_sessions(&user).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/sessions/:session_id/connect
/// Start the voice call with the record's selected specialist
pub async fn connect_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let record = match load_record(&state, &session_id).await {
        Ok(record) => record,
        Err(response) => return response,
    };

    // A stored report closes the consultation
    if record.report.is_some() {
        warn!("Connect rejected for session {}: already reported", session_id);
        return session_error_response(SessionError::AlreadyInProgress(LifecycleState::Ended));
    }

    info!("Connect requested for session {}", session_id);

    let handle = state.handle_or_spawn(&session_id).await;
    let result = handle.connect(record.selected_doctor).await;
    state.release_finished(&session_id).await;

    match result {
        Ok(status) => (StatusCode::ACCEPTED, Json(status)).into_response(),
        Err(e) => {
            warn!("Connect rejected for session {}: {}", session_id, e);
            session_error_response(e)
        }
    }
}

/// POST /api/sessions/:session_id/disconnect
/// End the call and return the report outcome
pub async fn disconnect_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = state.handle(&session_id).await else {
        return error_response(
            StatusCode::CONFLICT,
            format!("Session {} has no call to disconnect", session_id),
        );
    };

    let result = handle.disconnect().await;
    state.release_finished(&session_id).await;

    match result {
        Ok(report) => (
            StatusCode::OK,
            Json(DisconnectResponse {
                status: handle.status(),
                report,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("Disconnect rejected for session {}: {}", session_id, e);
            session_error_response(e)
        }
    }
}

/// GET /api/sessions/:session_id/status
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if let Some(handle) = state.handle(&session_id).await {
        return (StatusCode::OK, Json(handle.status())).into_response();
    }

    match load_record(&state, &session_id).await {
        Ok(record) => (StatusCode::OK, Json(archived_status(&record))).into_response(),
        Err(response) => response,
    }
}

/// Status of a session with no running driver, as far as its record tells
fn archived_status(record: &SessionRecord) -> SessionStatus {
    let mut status = SessionStatus::idle(record.session_id.clone());
    if record.report.is_some() {
        status.state = LifecycleState::Ended;
        status.specialist_id = Some(record.selected_doctor.id);
        status.specialist = Some(record.selected_doctor.specialist.clone());
        status.transcript_entries = record.conversation.as_ref().map_or(0, Vec::len);
        status.report = Some(ReportStatus::Stored);
    }
    status
}

/// GET /api/sessions/:session_id/transcript
/// Finalized entries plus the current live utterance per speaker
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if let Some(handle) = state.handle(&session_id).await {
        return match handle.transcript().await {
            Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
            Err(e) => session_error_response(e),
        };
    }

    match load_record(&state, &session_id).await {
        Ok(_) => (StatusCode::OK, Json(TranscriptSnapshot::default())).into_response(),
        Err(response) => response,
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
