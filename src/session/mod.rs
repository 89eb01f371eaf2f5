//! Consultation session lifecycle
//!
//! This module owns everything that happens between "connect" and "report":
//! - The lifecycle state machine
//!   (`Idle → Connecting → Active → Ending → Ended`, or `Failed`)
//! - Transcript accumulation from partial and final transcript events
//! - Classified retry of transient connection failures
//! - Resource release on every exit path
//!
//! `SessionController` holds the logic; `SessionHandle` runs one on its own
//! task and is what the HTTP layer and CLI talk to.

mod config;
mod controller;
mod driver;
mod retry;
mod state;
mod stats;
mod transcript;

pub use config::{AgentCallConfig, ModelConfig, PromptMessage, TranscriberConfig, VoiceConfig};
pub use controller::{ControllerDeps, SessionController, Wake};
pub use driver::SessionHandle;
pub use retry::{DelayScheduler, RetryDecision, RetryPolicy, RetryPolicyError, TokioScheduler};
pub use state::{ErrorInfo, LifecycleState, Session, SessionError};
pub use stats::SessionStatus;
pub use transcript::{
    ConversationMessage, LiveUtterance, Speaker, TranscriptAccumulator, TranscriptEntry,
    TranscriptSnapshot,
};
