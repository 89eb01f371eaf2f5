use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use super::controller::{SessionController, Wake};
use super::state::SessionError;
use super::stats::SessionStatus;
use super::transcript::TranscriptSnapshot;
use crate::report::ReportOutcome;
use crate::specialist::Specialist;

const COMMAND_BUFFER: usize = 16;

enum Command {
    Connect {
        specialist: Specialist,
        reply: oneshot::Sender<Result<SessionStatus, SessionError>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<ReportOutcome, SessionError>>,
    },
    Transcript {
        reply: oneshot::Sender<TranscriptSnapshot>,
    },
}

enum Input {
    Command(Option<Command>),
    Wake(Wake),
}

/// Handle to a controller running on its own task
///
/// Commands and transport events are handled one at a time by that task, so
/// a disconnect can never interleave with a half-processed event. Dropping
/// every handle shuts the session down.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub fn spawn(controller: SessionController) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let session_id = controller.session_id().to_string();
        let status = controller.subscribe();

        tokio::spawn(drive(controller, rx));

        Self {
            session_id,
            commands,
            status,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn connect(&self, specialist: Specialist) -> Result<SessionStatus, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect { specialist, reply }).await?;
        rx.await.map_err(|_| SessionError::DriverClosed)?
    }

    pub async fn disconnect(&self) -> Result<ReportOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Disconnect { reply }).await?;
        rx.await.map_err(|_| SessionError::DriverClosed)?
    }

    pub async fn transcript(&self) -> Result<TranscriptSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Transcript { reply }).await?;
        rx.await.map_err(|_| SessionError::DriverClosed)
    }

    /// Latest published status
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::DriverClosed)
    }
}

async fn drive(mut controller: SessionController, mut commands: mpsc::Receiver<Command>) {
    debug!("Session driver started for {}", controller.session_id());

    loop {
        let waiting = controller.is_waiting();

        // Events already delivered are handled before the next command
        let input = tokio::select! {
            biased;
            Some(wake) = controller.wait(), if waiting => Input::Wake(wake),
            cmd = commands.recv() => Input::Command(cmd),
        };

        match input {
            Input::Command(Some(cmd)) => handle_command(&mut controller, cmd).await,
            Input::Command(None) => break,
            Input::Wake(wake) => controller.process(wake).await,
        }
    }

    controller.shutdown().await;
    info!("Session driver stopped for {}", controller.session_id());
}

async fn handle_command(controller: &mut SessionController, cmd: Command) {
    // A caller that gave up on the reply does not stop the command
    match cmd {
        Command::Connect { specialist, reply } => {
            let result = controller.connect(specialist).await.map(|_| controller.status());
            let _ = reply.send(result);
        }
        Command::Disconnect { reply } => {
            let result = controller.disconnect().await;
            let _ = reply.send(result);
        }
        Command::Transcript { reply } => {
            let _ = reply.send(controller.transcript());
        }
    }
}
