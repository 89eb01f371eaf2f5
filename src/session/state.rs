use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::specialist::Specialist;
use crate::transport::{ErrorKind, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Connecting,
    Active,
    Ending,
    Ended,
    Failed,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Connecting)
                | (Connecting, Active)
                | (Connecting, Ending)
                | (Connecting, Failed)
                | (Active, Ending)
                | (Active, Failed)
                | (Ending, Ended)
                | (Failed, Idle)
                | (Failed, Connecting)
        )
    }

    /// States from which a new connection may be started
    pub fn accepts_connect(self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Failed)
    }

    /// States with a call attempt in flight
    pub fn is_live(self) -> bool {
        matches!(self, LifecycleState::Connecting | LifecycleState::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Ended | LifecycleState::Failed)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a session is already in progress ({0:?})")]
    AlreadyInProgress(LifecycleState),

    #[error("no call to disconnect ({0:?})")]
    NotConnected(LifecycleState),

    #[error("specialist {0} has no agent prompt or voice")]
    InvalidSpecialist(u32),

    #[error("invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("session driver has shut down")]
    DriverClosed,
}

/// Why a session ended up Failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TransportError> for ErrorInfo {
    fn from(err: &TransportError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// One consultation attempt
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub state: LifecycleState,
    pub specialist: Specialist,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<ErrorInfo>,
    /// Consecutive transient connection failures for the current attempt
    pub retry_attempt: u32,
    pub agent_speaking: bool,
}

impl Session {
    pub fn new(session_id: impl Into<String>, specialist: Specialist) -> Self {
        Self {
            session_id: session_id.into(),
            state: LifecycleState::Idle,
            specialist,
            started_at: None,
            ended_at: None,
            error: None,
            retry_attempt: 0,
            agent_speaking: false,
        }
    }

    pub fn transition(&mut self, next: LifecycleState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        match next {
            LifecycleState::Active => {
                self.started_at = Some(Utc::now());
                self.retry_attempt = 0;
            }
            LifecycleState::Ended | LifecycleState::Failed => {
                self.ended_at = Some(Utc::now());
                self.agent_speaking = false;
            }
            _ => {}
        }

        self.state = next;
        Ok(())
    }
}
