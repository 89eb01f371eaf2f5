// Shared fakes for the voice transport, audio capture, backoff timer and
// summarization service.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::future::BoxFuture;
use medvoice::ai::CompletionError;
use medvoice::audio::{AudioBackend, AudioBackendFactory, AudioFrame};
use medvoice::config::AgentDefaults;
use medvoice::report::{ReportRequest, ReportRequestor, SummarizationService};
use medvoice::session::{
    AgentCallConfig, ControllerDeps, DelayScheduler, RetryPolicy, SessionController,
};
use medvoice::specialist::{Specialist, SpecialistCatalog};
use medvoice::store::{MemoryStore, NewSession, SessionStore};
use medvoice::transport::{TransportError, TransportEvent, TransportFactory, VoiceTransport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const VALID_REPORT: &str = r#"{
    "sessionId": "ignored",
    "agent": "General Physician",
    "user": "Anonymous",
    "timestamp": "2025-01-01T10:00:00Z",
    "chiefComplaint": "Headache for two days",
    "summary": "The patient reports a persistent headache.",
    "symptoms": ["headache", "fatigue"],
    "duration": "2 days",
    "severity": "mild",
    "medicationsMentioned": ["ibuprofen"],
    "recommendations": ["Rest", "Stay hydrated"]
}"#;

// ============================================================================
// Voice transport
// ============================================================================

#[derive(Default)]
struct TransportState {
    created: usize,
    configs: Vec<AgentCallConfig>,
    connect_script: VecDeque<Result<(), TransportError>>,
    senders: Vec<mpsc::Sender<TransportEvent>>,
    disconnects: usize,
    fail_disconnect: bool,
}

/// Records every connection and hands the event senders to the test
#[derive(Clone, Default)]
pub struct FakeTransportFactory {
    state: Arc<Mutex<TransportState>>,
}

impl FakeTransportFactory {
    /// Queue the result of the next `connect` call; unscripted calls succeed
    pub fn script_connect(&self, result: Result<(), TransportError>) {
        self.state.lock().unwrap().connect_script.push_back(result);
    }

    pub fn fail_disconnect(&self) {
        self.state.lock().unwrap().fail_disconnect = true;
    }

    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().configs.len()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn last_config(&self) -> Option<AgentCallConfig> {
        self.state.lock().unwrap().configs.last().cloned()
    }

    /// Sender for the most recent successful connection
    pub fn events(&self) -> mpsc::Sender<TransportEvent> {
        self.state
            .lock()
            .unwrap()
            .senders
            .last()
            .cloned()
            .expect("no successful connection yet")
    }

    /// Close every event stream from the transport side
    pub fn close_streams(&self) {
        self.state.lock().unwrap().senders.clear();
    }
}

impl TransportFactory for FakeTransportFactory {
    fn create(&self, _session_id: &str) -> Box<dyn VoiceTransport> {
        self.state.lock().unwrap().created += 1;
        Box::new(FakeTransport {
            state: self.state.clone(),
        })
    }
}

struct FakeTransport {
    state: Arc<Mutex<TransportState>>,
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(
        &mut self,
        config: &AgentCallConfig,
        _audio: Option<mpsc::Receiver<AudioFrame>>,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.configs.push(config.clone());
        if let Some(Err(e)) = state.connect_script.pop_front() {
            return Err(e);
        }
        let (tx, rx) = mpsc::channel(64);
        state.senders.push(tx);
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;
        if state.fail_disconnect {
            return Err(TransportError::fatal("socket already closed"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Audio capture
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeAudioFactory {
    pub started: Arc<AtomicUsize>,
    pub stopped: Arc<AtomicUsize>,
    pub fail_stop: bool,
}

impl FakeAudioFactory {
    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl AudioBackendFactory for FakeAudioFactory {
    fn create(&self) -> anyhow::Result<Option<Box<dyn AudioBackend>>> {
        Ok(Some(Box::new(FakeAudio {
            factory: self.clone(),
            tx: None,
        })))
    }
}

struct FakeAudio {
    factory: FakeAudioFactory,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

#[async_trait]
impl AudioBackend for FakeAudio {
    async fn start(&mut self) -> anyhow::Result<mpsc::Receiver<AudioFrame>> {
        self.factory.started.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(4);
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.factory.stopped.fetch_add(1, Ordering::SeqCst);
        self.tx = None;
        if self.factory.fail_stop {
            anyhow::bail!("microphone already released");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "fake-mic"
    }
}

// ============================================================================
// Backoff timer
// ============================================================================

/// Records requested delays and elapses them immediately
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingScheduler {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl DelayScheduler for RecordingScheduler {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        self.delays.lock().unwrap().push(delay);
        Box::pin(async {})
    }
}

// ============================================================================
// Summarization
// ============================================================================

#[derive(Clone)]
pub enum SummaryScript {
    Answer(String),
    Unavailable,
    Hang,
}

#[derive(Clone)]
pub struct FakeSummarizer {
    script: Arc<Mutex<SummaryScript>>,
    requests: Arc<Mutex<Vec<ReportRequest>>>,
}

impl FakeSummarizer {
    pub fn answering(raw: &str) -> Self {
        Self::scripted(SummaryScript::Answer(raw.to_string()))
    }

    pub fn scripted(script: SummaryScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ReportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummarizationService for FakeSummarizer {
    async fn summarize(&self, request: &ReportRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.script.lock().unwrap().clone();
        match script {
            SummaryScript::Answer(raw) => Ok(raw),
            SummaryScript::Unavailable => Err(CompletionError::Http {
                status: 503,
                body: "upstream unavailable".to_string(),
            }),
            SummaryScript::Hang => {
                futures::future::pending::<()>().await;
                Err(CompletionError::EmptyResponse)
            }
        }
    }
}

// ============================================================================
// Controller harness
// ============================================================================

pub fn general_physician() -> Specialist {
    SpecialistCatalog::builtin().get(1).cloned().unwrap()
}

pub struct Harness {
    pub transports: FakeTransportFactory,
    pub audio: FakeAudioFactory,
    pub scheduler: RecordingScheduler,
    pub summarizer: FakeSummarizer,
    pub store: Arc<MemoryStore>,
    pub session_id: String,
    pub deps: ControllerDeps,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(FakeAudioFactory::default(), FakeSummarizer::answering(VALID_REPORT), None).await
    }

    pub async fn with(
        audio: FakeAudioFactory,
        summarizer: FakeSummarizer,
        report_timeout: Option<Duration>,
    ) -> Self {
        let transports = FakeTransportFactory::default();
        let scheduler = RecordingScheduler::default();
        let store = Arc::new(MemoryStore::new());

        let record = store
            .create_session(NewSession {
                notes: "headache".to_string(),
                selected_doctor: general_physician(),
                created_by: Some("patient@example.com".to_string()),
            })
            .await
            .unwrap();

        let reporter = Arc::new(ReportRequestor::new(
            Arc::new(summarizer.clone()),
            store.clone(),
            report_timeout,
        ));

        let deps = ControllerDeps {
            transports: Arc::new(transports.clone()),
            audio: Arc::new(audio.clone()),
            reporter,
            scheduler: Arc::new(scheduler.clone()),
            retry: RetryPolicy::default(),
            agent: AgentDefaults::default(),
        };

        Self {
            transports,
            audio,
            scheduler,
            summarizer,
            store,
            session_id: record.session_id,
            deps,
        }
    }

    pub fn controller(&self) -> SessionController {
        SessionController::new(self.session_id.clone(), self.deps.clone())
    }
}

pub fn transcript(speaker: medvoice::session::Speaker, final_: bool, text: &str) -> TransportEvent {
    TransportEvent::Transcript {
        speaker,
        kind: if final_ {
            medvoice::transport::TranscriptKind::Final
        } else {
            medvoice::transport::TranscriptKind::Partial
        },
        text: text.to_string(),
    }
}
