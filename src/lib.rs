pub mod ai;
pub mod audio;
pub mod config;
pub mod http;
pub mod report;
pub mod session;
pub mod specialist;
pub mod store;
pub mod transport;

pub use ai::{CompletionClient, CompletionError, CompletionService};
pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    SourceBackendFactory, WavReplayBackend,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use report::{
    CompletionSummarizer, MedicalReport, ReportError, ReportOutcome, ReportRequestor,
    SummarizationService,
};
pub use session::{
    ControllerDeps, LifecycleState, RetryPolicy, Session, SessionController, SessionError,
    SessionHandle, SessionStatus, TokioScheduler, TranscriptAccumulator, TranscriptEntry,
};
pub use specialist::{Specialist, SpecialistCatalog, SpecialistSuggester};
pub use store::{SessionRecord, SessionStore};
pub use transport::{
    ErrorKind, NatsTransportFactory, TransportError, TransportEvent, TransportFactory,
    VoiceTransport,
};
