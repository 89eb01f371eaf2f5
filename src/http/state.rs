use crate::session::{ControllerDeps, SessionController, SessionHandle, SessionStatus};
use crate::specialist::{SpecialistCatalog, SpecialistSuggester};
use crate::store::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;

type Sessions = Arc<RwLock<HashMap<String, SessionHandle>>>;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub catalog: Arc<SpecialistCatalog>,
    pub suggester: Arc<SpecialistSuggester>,

    /// Consultations with a running driver (session_id → handle)
    ///
    /// Handles are dropped once their session is Ended or Failed, which stops
    /// the driver task.
    pub sessions: Sessions,

    /// Collaborators handed to every new controller
    pub deps: ControllerDeps,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<SpecialistCatalog>,
        suggester: Arc<SpecialistSuggester>,
        deps: ControllerDeps,
    ) -> Self {
        Self {
            store,
            catalog,
            suggester,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
        }
    }

    pub async fn handle(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Handle for a new call on `session_id`
    ///
    /// A finished handle is replaced by a freshly spawned driver, so a
    /// connect never reaches a session that is already Ended or Failed.
    pub async fn handle_or_spawn(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(session_id) {
            if !handle.status().state.is_terminal() {
                return handle.clone();
            }
        }

        let handle = SessionHandle::spawn(SessionController::new(session_id, self.deps.clone()));
        sessions.insert(session_id.to_string(), handle.clone());
        reap_when_finished(self.sessions.clone(), session_id.to_string(), handle.subscribe());
        handle
    }

    /// Drop the handle for `session_id` if its session has finished
    pub async fn release_finished(&self, session_id: &str) {
        release_if_finished(&self.sessions, session_id).await;
    }
}

async fn release_if_finished(sessions: &Sessions, session_id: &str) {
    let mut sessions = sessions.write().await;
    let finished = sessions
        .get(session_id)
        .is_some_and(|h| h.status().state.is_terminal());
    if finished {
        sessions.remove(session_id);
        debug!("Released finished session {}", session_id);
    }
}

/// Remove the handle once the session reaches Ended or Failed
fn reap_when_finished(
    sessions: Sessions,
    session_id: String,
    mut status: watch::Receiver<SessionStatus>,
) {
    tokio::spawn(async move {
        // Err means the driver already stopped
        let finished = status.wait_for(|s| s.state.is_terminal()).await.is_ok();
        if finished {
            release_if_finished(&sessions, &session_id).await;
        }
    });
}
