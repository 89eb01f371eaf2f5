use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medvoice::audio::{AudioBackendConfig, AudioSource, SourceBackendFactory};
use medvoice::session::{ControllerDeps, SessionController, TokioScheduler};
use medvoice::specialist::{SpecialistCatalog, SpecialistSuggester, GENERAL_PHYSICIAN_ID};
use medvoice::store::{self, NewSession, SessionStore};
use medvoice::{
    create_router, AppState, CompletionClient, CompletionSummarizer, Config, NatsTransportFactory,
    ReportOutcome, ReportRequestor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "medvoice", version, about = "Voice consultations with AI medical specialists")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, global = true, default_value = "config/medvoice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Run a single consultation in the terminal; Ctrl-C ends the call
    Consult {
        /// Specialist id from the catalog
        #[arg(long, default_value_t = GENERAL_PHYSICIAN_ID)]
        specialist: u32,

        /// Symptom notes stored with the session
        #[arg(long, default_value = "")]
        notes: String,

        /// Stream a WAV recording as the patient's microphone
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Consult {
            specialist,
            notes,
            replay,
        } => consult(cfg, specialist, notes, replay).await,
    }
}

struct Services {
    store: Arc<dyn SessionStore>,
    completion: Arc<CompletionClient>,
    deps: ControllerDeps,
}

fn build_services(cfg: &Config, audio: SourceBackendFactory) -> Result<Services> {
    let store = store::open(&cfg.store).context("Failed to open session store")?;
    let completion = Arc::new(CompletionClient::from_config(&cfg.ai)?);

    let summarizer = Arc::new(CompletionSummarizer::new(completion.clone()));
    let reporter = Arc::new(ReportRequestor::new(
        summarizer,
        store.clone(),
        cfg.report.timeout(),
    ));

    let deps = ControllerDeps {
        transports: Arc::new(NatsTransportFactory::new(cfg.nats.url.clone())),
        audio: Arc::new(audio),
        reporter,
        scheduler: Arc::new(TokioScheduler),
        retry: cfg.retry.policy()?,
        agent: cfg.agent.clone(),
    };

    Ok(Services {
        store,
        completion,
        deps,
    })
}

async fn serve(cfg: Config) -> Result<()> {
    // Browsers stream their own microphone to the voice runtime
    let services = build_services(&cfg, SourceBackendFactory::disabled())?;

    let catalog = Arc::new(SpecialistCatalog::builtin());
    let suggester = Arc::new(SpecialistSuggester::new(
        services.completion.clone(),
        catalog.clone(),
    ));
    let state = AppState::new(services.store, catalog, suggester, services.deps);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}

async fn consult(
    cfg: Config,
    specialist_id: u32,
    notes: String,
    replay: Option<PathBuf>,
) -> Result<()> {
    let catalog = SpecialistCatalog::builtin();
    let Some(specialist) = catalog.get(specialist_id).cloned() else {
        bail!("Unknown specialist id {}", specialist_id);
    };

    let audio = match replay {
        Some(path) => {
            SourceBackendFactory::new(AudioSource::Wav(path), AudioBackendConfig::default())
        }
        None => SourceBackendFactory::disabled(),
    };
    let services = build_services(&cfg, audio)?;

    let record = services
        .store
        .create_session(NewSession {
            notes,
            selected_doctor: specialist.clone(),
            created_by: None,
        })
        .await?;

    info!(
        "Consulting {} in session {} (Ctrl-C to end the call)",
        specialist.specialist, record.session_id
    );

    let mut controller = SessionController::new(record.session_id.clone(), services.deps);
    controller.connect(specialist).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0;
    while !controller.state().is_terminal() && controller.is_waiting() {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ending call");
                controller.disconnect().await?;
                break;
            }
            Some(wake) = controller.wait() => controller.process(wake).await,
        }

        let snapshot = controller.transcript();
        for entry in snapshot.entries.iter().skip(printed) {
            println!("[{}] {}", entry.speaker.as_role(), entry.text);
        }
        printed = snapshot.entries.len();
    }

    if let Some(session) = controller.session() {
        if let Some(err) = &session.error {
            warn!("Session failed ({:?}): {}", err.kind, err.message);
        }
    }

    match controller.report() {
        Some(ReportOutcome::Failed { error }) => warn!("No report generated: {}", error),
        Some(outcome) => {
            if let ReportOutcome::NotStored { error, .. } = outcome {
                warn!("Report generated but not stored: {}", error);
            }
            if let Some(report) = outcome.report() {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
        }
        None => {}
    }

    controller.shutdown().await;
    Ok(())
}
