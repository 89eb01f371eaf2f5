use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::AgentCallConfig;
use super::retry::{DelayScheduler, RetryDecision, RetryPolicy};
use super::state::{ErrorInfo, LifecycleState, Session, SessionError};
use super::stats::SessionStatus;
use super::transcript::{TranscriptAccumulator, TranscriptSnapshot};
use crate::audio::{AudioBackend, AudioBackendFactory};
use crate::config::AgentDefaults;
use crate::report::{ReportError, ReportOutcome, ReportRequestor};
use crate::specialist::Specialist;
use crate::transport::{
    ErrorKind, TranscriptKind, TransportError, TransportEvent, TransportFactory, VoiceTransport,
};

/// Collaborators a controller needs; cheap to clone per consultation
#[derive(Clone)]
pub struct ControllerDeps {
    pub transports: Arc<dyn TransportFactory>,
    pub audio: Arc<dyn AudioBackendFactory>,
    pub reporter: Arc<ReportRequestor>,
    pub scheduler: Arc<dyn DelayScheduler>,
    pub retry: RetryPolicy,
    pub agent: AgentDefaults,
}

/// Resources held for one connection attempt
struct Connection {
    transport: Box<dyn VoiceTransport>,
    audio: Option<Box<dyn AudioBackend>>,
    events: Option<mpsc::Receiver<TransportEvent>>,
}

impl Connection {
    /// Release everything; a failing step never skips the ones after it
    async fn release(mut self) {
        if let Some(mut audio) = self.audio.take() {
            if let Err(e) = audio.stop().await {
                warn!("Failed to stop audio backend {}: {}", audio.name(), e);
            }
        }

        if let Err(e) = self.transport.disconnect().await {
            warn!("Transport {} failed to stop cleanly: {}", self.transport.name(), e);
        }

        // Dropping the receiver ends the event subscription
        self.events.take();
    }
}

/// What the controller was waiting for when it woke up
#[derive(Debug)]
pub enum Wake {
    Event(TransportEvent),
    StreamClosed,
    BackoffElapsed,
}

/// Drives one consultation through its lifecycle
///
/// All transitions happen through `connect`, `disconnect` and `process`, so
/// the caller decides which event loop they run on.
pub struct SessionController {
    session_id: String,
    deps: ControllerDeps,
    session: Option<Session>,
    transcript: TranscriptAccumulator,
    connection: Option<Connection>,
    backoff: Option<BoxFuture<'static, ()>>,
    report: Option<ReportOutcome>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionController {
    pub fn new(session_id: impl Into<String>, deps: ControllerDeps) -> Self {
        let session_id = session_id.into();
        let (status_tx, _) = watch::channel(SessionStatus::idle(session_id.clone()));

        Self {
            session_id,
            deps,
            session: None,
            transcript: TranscriptAccumulator::new(),
            connection: None,
            backoff: None,
            report: None,
            status_tx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> LifecycleState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(LifecycleState::Idle)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn transcript(&self) -> TranscriptSnapshot {
        self.transcript.snapshot()
    }

    pub fn report(&self) -> Option<&ReportOutcome> {
        self.report.as_ref()
    }

    /// Whether transport or audio resources are currently held
    pub fn holds_resources(&self) -> bool {
        self.connection.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        let mut status = SessionStatus::idle(self.session_id.clone());
        if let Some(session) = &self.session {
            let end = session.ended_at.unwrap_or_else(chrono::Utc::now);
            status.state = session.state;
            status.specialist_id = Some(session.specialist.id);
            status.specialist = Some(session.specialist.specialist.clone());
            status.started_at = session.started_at;
            status.ended_at = session.ended_at;
            status.duration_secs = session
                .started_at
                .map(|start| end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0);
            status.retry_attempt = session.retry_attempt;
            status.error = session.error.clone();
            status.agent_speaking = session.agent_speaking;
        }
        let snapshot = self.transcript.snapshot();
        status.transcript_entries = snapshot.entries.len();
        status.live = snapshot.live;
        status.report = self.report.as_ref().map(|r| r.status());
        status
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }

    /// Start a new session with `specialist`
    ///
    /// Returns once the call has been requested; the outcome is observed
    /// through state changes.
    pub async fn connect(&mut self, specialist: Specialist) -> Result<(), SessionError> {
        let state = self.state();
        if !state.accepts_connect() {
            return Err(SessionError::AlreadyInProgress(state));
        }
        if !specialist.is_connectable() {
            return Err(SessionError::InvalidSpecialist(specialist.id));
        }

        info!(
            "Starting session {} with {} (id={})",
            self.session_id, specialist.specialist, specialist.id
        );

        let mut session = Session::new(self.session_id.clone(), specialist);
        session.transition(LifecycleState::Connecting)?;

        self.session = Some(session);
        self.transcript.clear();
        self.report = None;
        self.backoff = None;

        self.open_connection().await;
        self.publish();
        Ok(())
    }

    /// End the call and generate its report
    ///
    /// Resources are released before the report is requested, even when the
    /// transport fails to stop.
    pub async fn disconnect(&mut self) -> Result<ReportOutcome, SessionError> {
        let state = self.state();
        if !state.is_live() {
            return Err(SessionError::NotConnected(state));
        }

        info!("Disconnect requested for session {}", self.session_id);
        self.backoff = None;
        let outcome = self.finish().await;
        Ok(outcome)
    }

    /// Whether `wait` has anything to wait for
    pub fn is_waiting(&self) -> bool {
        self.backoff.is_some()
            || self
                .connection
                .as_ref()
                .map(|c| c.events.is_some())
                .unwrap_or(false)
    }

    /// Wait for the next transport event or the end of a retry backoff
    ///
    /// Cancel-safe: dropping the future loses no event and does not restart
    /// the backoff. Returns `None` when there is nothing to wait for.
    pub async fn wait(&mut self) -> Option<Wake> {
        if let Some(backoff) = self.backoff.as_mut() {
            backoff.await;
            return Some(Wake::BackoffElapsed);
        }

        let events = self.connection.as_mut()?.events.as_mut()?;
        match events.recv().await {
            Some(event) => Some(Wake::Event(event)),
            None => Some(Wake::StreamClosed),
        }
    }

    pub async fn process(&mut self, wake: Wake) {
        match wake {
            Wake::BackoffElapsed => {
                self.backoff = None;
                if self.state() == LifecycleState::Connecting {
                    let attempt = self.session.as_ref().map(|s| s.retry_attempt).unwrap_or(0);
                    info!(
                        "Retrying connection for session {} after {} failed attempt(s)",
                        self.session_id, attempt
                    );
                    self.open_connection().await;
                }
            }
            Wake::StreamClosed => self.on_stream_closed().await,
            Wake::Event(event) => self.handle_event(event).await,
        }
        self.publish();
    }

    /// Wait for and process one wake-up; false when there was nothing to wait for
    pub async fn step(&mut self) -> bool {
        match self.wait().await {
            Some(wake) => {
                self.process(wake).await;
                true
            }
            None => false,
        }
    }

    /// Process wake-ups until the session no longer waits on anything
    pub async fn run(&mut self) {
        while self.step().await {}
    }

    /// Release held resources without generating a report
    pub async fn shutdown(&mut self) {
        self.backoff = None;
        if let Some(connection) = self.connection.take() {
            info!("Shutting down session {}", self.session_id);
            connection.release().await;
        }
    }

    /// Single dispatch point for transport events
    async fn handle_event(&mut self, event: TransportEvent) {
        let state = self.state();

        match event {
            TransportEvent::CallStarted if state == LifecycleState::Connecting => {
                self.transition(LifecycleState::Active);
                info!("Call started for session {}", self.session_id);
            }
            TransportEvent::CallEnded if state.is_live() => {
                info!("Call ended remotely for session {}", self.session_id);
                self.finish().await;
            }
            TransportEvent::Transcript { speaker, kind, text } if state.is_live() => match kind {
                TranscriptKind::Partial => self.transcript.on_partial(speaker, text),
                TranscriptKind::Final => {
                    self.transcript.on_final(speaker, text);
                }
            },
            TransportEvent::SpeechStarted if state.is_live() => self.set_agent_speaking(true),
            TransportEvent::SpeechEnded if state.is_live() => self.set_agent_speaking(false),
            TransportEvent::Error(err) if state.is_live() => {
                if err.kind == ErrorKind::Terminal {
                    info!("Call for session {} ended by remote: {}", self.session_id, err.message);
                    self.finish().await;
                } else if state == LifecycleState::Connecting {
                    self.on_connect_error(err).await;
                } else {
                    error!("Call for session {} failed: {}", self.session_id, err);
                    self.fail(&err).await;
                }
            }
            other => debug!("Ignoring {:?} in state {:?}", other, state),
        }
    }

    async fn on_stream_closed(&mut self) {
        match self.state() {
            LifecycleState::Active => {
                warn!("Event stream closed for active session {}", self.session_id);
                self.finish().await;
            }
            LifecycleState::Connecting => {
                let err = TransportError::fatal("transport closed before the call started");
                self.fail(&err).await;
            }
            _ => {
                if let Some(connection) = self.connection.take() {
                    connection.release().await;
                }
            }
        }
    }

    /// Acquire resources and request the call for the current session
    async fn open_connection(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let config = AgentCallConfig::for_specialist(&session.specialist, &self.deps.agent);
        let mut transport = self.deps.transports.create(&self.session_id);

        let mut audio = match self.deps.audio.create() {
            Ok(audio) => audio,
            Err(e) => {
                let err = TransportError::fatal(format!("audio capture unavailable: {}", e));
                self.fail(&err).await;
                return;
            }
        };

        let started = match audio.as_mut() {
            Some(backend) => backend.start().await.map(Some),
            None => Ok(None),
        };
        let audio_rx = match started {
            Ok(rx) => rx,
            Err(e) => {
                let err = TransportError::fatal(format!("failed to start audio capture: {}", e));
                Connection {
                    transport,
                    audio,
                    events: None,
                }
                .release()
                .await;
                self.fail(&err).await;
                return;
            }
        };

        debug!("Connecting session {} via {}", self.session_id, transport.name());

        match transport.connect(&config, audio_rx).await {
            Ok(events) => {
                self.connection = Some(Connection {
                    transport,
                    audio,
                    events: Some(events),
                });
            }
            Err(err) => {
                Connection {
                    transport,
                    audio,
                    events: None,
                }
                .release()
                .await;
                self.on_connect_error(err).await;
            }
        }
    }

    /// Apply the retry policy to an error seen while Connecting
    async fn on_connect_error(&mut self, err: TransportError) {
        if err.kind == ErrorKind::Terminal {
            self.finish().await;
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if err.kind == ErrorKind::Transient {
            session.retry_attempt += 1;
        }
        let attempt = session.retry_attempt;

        match self.deps.retry.decide(attempt, err.kind) {
            RetryDecision::Retry(delay) => {
                warn!(
                    "Connection attempt {} for session {} failed ({}), retrying in {:?}",
                    attempt, self.session_id, err.message, delay
                );
                if let Some(connection) = self.connection.take() {
                    connection.release().await;
                }
                // A retried attempt starts from an empty transcript
                self.transcript.clear();
                self.backoff = Some(self.deps.scheduler.sleep(delay));
            }
            RetryDecision::GiveUp => {
                error!(
                    "Giving up on session {} after {} attempt(s): {}",
                    self.session_id, attempt, err
                );
                self.fail(&err).await;
            }
        }
    }

    fn set_agent_speaking(&mut self, speaking: bool) {
        if let Some(session) = self.session.as_mut() {
            session.agent_speaking = speaking;
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if let Some(session) = self.session.as_mut() {
            let from = session.state;
            match session.transition(next) {
                Ok(()) => debug!("Session {}: {:?} -> {:?}", self.session_id, from, next),
                Err(e) => error!("Session {}: {}", self.session_id, e),
            }
        }
        self.publish();
    }

    async fn fail(&mut self, err: &TransportError) {
        self.backoff = None;
        if let Some(connection) = self.connection.take() {
            connection.release().await;
        }
        if let Some(session) = self.session.as_mut() {
            session.error = Some(ErrorInfo::from(err));
        }
        self.transition(LifecycleState::Failed);
    }

    /// Active/Connecting → Ending → report → Ended
    async fn finish(&mut self) -> ReportOutcome {
        if let Some(connection) = self.connection.take() {
            connection.release().await;
        }
        self.transition(LifecycleState::Ending);

        let outcome = match &self.session {
            Some(session) => {
                self.deps
                    .reporter
                    .generate(session, self.transcript.finalized())
                    .await
            }
            None => ReportOutcome::Failed {
                error: ReportError::Service("no session to report on".to_string()),
            },
        };

        if !outcome.is_stored() {
            warn!(
                "Report for session {} was not stored ({:?})",
                self.session_id,
                outcome.status()
            );
        }
        self.report = Some(outcome.clone());
        self.transition(LifecycleState::Ended);

        outcome
    }
}
