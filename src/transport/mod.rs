//! Voice transport binding
//!
//! The voice agent runtime (speech recognition, the agent's model, speech
//! synthesis) lives behind a transport. A binding offers connect/disconnect
//! and an ordered stream of call events; everything above it only sees
//! `TransportEvent`s.

pub mod messages;
mod nats;

pub use nats::{NatsTransport, NatsTransportFactory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;
use crate::session::{AgentCallConfig, Speaker};

/// How a transport failure should be treated by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network hiccup or timeout; the connection may be retried
    Transient,
    /// The remote side ended the call; a normal termination
    Terminal,
    /// Configuration or authorization problem; never retried
    Fatal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?} transport error: {message}")]
pub struct TransportError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Build from the `(type, msg)` pair reported by the voice runtime
    pub fn from_report(error_type: Option<&str>, msg: Option<&str>) -> Self {
        let kind = classify(error_type, msg);
        let message = msg
            .or(error_type)
            .unwrap_or("An error occurred during the call")
            .to_string();
        Self { kind, message }
    }
}

/// Message the voice runtime sends when a meeting is closed from its side
const MEETING_ENDED_MSG: &str = "Meeting has ended";

/// Map a runtime error report onto an `ErrorKind`
///
/// Unlabelled or unknown errors are fatal so they are never retried blindly.
pub fn classify(error_type: Option<&str>, msg: Option<&str>) -> ErrorKind {
    if msg == Some(MEETING_ENDED_MSG) {
        return ErrorKind::Terminal;
    }
    match error_type {
        Some("network") | Some("timeout") => ErrorKind::Transient,
        Some("ejected") => ErrorKind::Terminal,
        _ => ErrorKind::Fatal,
    }
}

/// Whether a transcript event is still being spoken or settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    Partial,
    Final,
}

/// Events emitted by a connected transport, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    CallStarted,
    CallEnded,
    Transcript {
        speaker: Speaker,
        kind: TranscriptKind,
        text: String,
    },
    SpeechStarted,
    SpeechEnded,
    Error(TransportError),
}

/// A live connection to the voice agent runtime
///
/// One instance serves exactly one connection attempt; it is created by a
/// `TransportFactory` at connect time and dropped after `disconnect`.
#[async_trait]
pub trait VoiceTransport: Send {
    /// Start the call
    ///
    /// `audio` carries locally captured frames to forward, if any. Returns the
    /// receiver for the call's events.
    async fn connect(
        &mut self,
        config: &AgentCallConfig,
        audio: Option<mpsc::Receiver<AudioFrame>>,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    /// Stop the call and release the connection
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Binding name for logging
    fn name(&self) -> &str;
}

/// Creates a fresh transport per connection attempt
pub trait TransportFactory: Send + Sync {
    fn create(&self, session_id: &str) -> Box<dyn VoiceTransport>;
}
