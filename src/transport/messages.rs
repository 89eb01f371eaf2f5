use serde::{Deserialize, Serialize};

use super::{TranscriptKind, TransportError, TransportEvent};
use crate::session::{AgentCallConfig, Speaker};

/// Control message published to `voice.control.<session_id>`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlMessage {
    Start {
        session_id: String,
        assistant: AgentCallConfig,
    },
    Stop {
        session_id: String,
    },
}

/// Captured audio published to `voice.audio.<session_id>`
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Event received on `voice.event.<session_id>`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEventMessage {
    CallStart,
    CallEnd,
    #[serde(rename_all = "camelCase")]
    Transcript {
        role: String,
        transcript: String,
        transcript_type: TranscriptKind,
    },
    SpeechStart,
    SpeechEnd,
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        error_type: Option<String>,
        #[serde(default)]
        msg: Option<String>,
    },
}

impl From<VoiceEventMessage> for TransportEvent {
    fn from(msg: VoiceEventMessage) -> Self {
        match msg {
            VoiceEventMessage::CallStart => TransportEvent::CallStarted,
            VoiceEventMessage::CallEnd => TransportEvent::CallEnded,
            VoiceEventMessage::Transcript {
                role,
                transcript,
                transcript_type,
            } => TransportEvent::Transcript {
                speaker: Speaker::from_role(&role),
                kind: transcript_type,
                text: transcript,
            },
            VoiceEventMessage::SpeechStart => TransportEvent::SpeechStarted,
            VoiceEventMessage::SpeechEnd => TransportEvent::SpeechEnded,
            VoiceEventMessage::Error { error_type, msg } => TransportEvent::Error(
                TransportError::from_report(error_type.as_deref(), msg.as_deref()),
            ),
        }
    }
}
