use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

impl Speaker {
    /// Voice runtime role names: anything other than "user" is the agent
    pub fn from_role(role: &str) -> Self {
        if role == "user" {
            Speaker::User
        } else {
            Speaker::Agent
        }
    }

    pub fn as_role(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Agent => "assistant",
        }
    }
}

/// A finalized utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Position in the session's transcript, starting at 0
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

/// An utterance still being spoken; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUtterance {
    pub speaker: Speaker,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

/// Role/text pair stored alongside the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub text: String,
}

impl From<&TranscriptEntry> for ConversationMessage {
    fn from(entry: &TranscriptEntry) -> Self {
        Self {
            role: entry.speaker.as_role().to_string(),
            text: entry.text.clone(),
        }
    }
}

/// Read-only view of a transcript at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnapshot {
    pub entries: Vec<TranscriptEntry>,
    pub live: Vec<LiveUtterance>,
}

/// Accumulates transcript events into an append-only log
///
/// Partials replace the speaker's live utterance; finals append an entry and
/// clear it. Arrival order is kept as-is, with no deduplication.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    entries: Vec<TranscriptEntry>,
    live_user: Option<LiveUtterance>,
    live_agent: Option<LiveUtterance>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_slot(&mut self, speaker: Speaker) -> &mut Option<LiveUtterance> {
        match speaker {
            Speaker::User => &mut self.live_user,
            Speaker::Agent => &mut self.live_agent,
        }
    }

    pub fn on_partial(&mut self, speaker: Speaker, text: impl Into<String>) {
        *self.live_slot(speaker) = Some(LiveUtterance {
            speaker,
            text: text.into(),
            updated_at: Utc::now(),
        });
    }

    pub fn on_final(&mut self, speaker: Speaker, text: impl Into<String>) -> &TranscriptEntry {
        self.live_slot(speaker).take();

        let entry = TranscriptEntry {
            id: self.entries.len() as u64,
            speaker,
            text: text.into(),
            captured_at: Utc::now(),
        };
        debug!("{}: {}", speaker.as_role(), entry.text);

        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Finalized entries only; this is what a report is generated from
    pub fn finalized(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn live(&self, speaker: Speaker) -> Option<&LiveUtterance> {
        match speaker {
            Speaker::User => self.live_user.as_ref(),
            Speaker::Agent => self.live_agent.as_ref(),
        }
    }

    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            entries: self.entries.clone(),
            live: self
                .live_user
                .iter()
                .chain(self.live_agent.iter())
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything; used when a new connection attempt starts
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live_user = None;
        self.live_agent = None;
    }
}
