use async_nats::Client;
use async_trait::async_trait;
use base64::Engine;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::messages::{AudioFrameMessage, ControlMessage, VoiceEventMessage};
use super::{TransportError, TransportEvent, TransportFactory, VoiceTransport};
use crate::audio::AudioFrame;
use crate::session::AgentCallConfig;

/// Buffered events between the NATS subscriber and the session
const EVENT_BUFFER: usize = 256;

/// How long `disconnect` waits for queued audio and the final-frame marker
const AUDIO_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Voice transport bridged over NATS
///
/// The voice agent runtime listens on `voice.control.<session>`, consumes audio
/// from `voice.audio.<session>` and publishes call events to
/// `voice.event.<session>`.
pub struct NatsTransport {
    url: String,
    session_id: String,
    client: Option<Client>,
    tasks: Vec<JoinHandle<()>>,
    audio_task: Option<JoinHandle<()>>,
}

impl NatsTransport {
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_id: session_id.into(),
            client: None,
            tasks: Vec::new(),
            audio_task: None,
        }
    }

    fn control_subject(&self) -> String {
        format!("voice.control.{}", self.session_id)
    }

    fn event_subject(&self) -> String {
        format!("voice.event.{}", self.session_id)
    }

    fn audio_subject(&self) -> String {
        format!("voice.audio.{}", self.session_id)
    }

    async fn publish_control(
        client: &Client,
        subject: String,
        msg: &ControlMessage,
    ) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(msg).map_err(|e| {
            TransportError::fatal(format!("Failed to encode control message: {}", e))
        })?;

        client.publish(subject, payload.into()).await.map_err(|e| {
            TransportError::transient(format!("Failed to publish control message: {}", e))
        })
    }

    fn spawn_event_forwarder(
        &mut self,
        mut subscriber: async_nats::Subscriber,
        tx: mpsc::Sender<TransportEvent>,
    ) {
        let session_id = self.session_id.clone();
        let task = tokio::spawn(async move {
            debug!("Event forwarder started for {}", session_id);

            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<VoiceEventMessage>(&msg.payload) {
                    Ok(event) => {
                        if tx.send(event.into()).await.is_err() {
                            // Session dropped its receiver
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse voice event: {}", e);
                    }
                }
            }

            debug!("Event forwarder stopped for {}", session_id);
        });
        self.tasks.push(task);
    }

    fn spawn_audio_forwarder(&mut self, client: Client, mut audio_rx: mpsc::Receiver<AudioFrame>) {
        let subject = self.audio_subject();
        let session_id = self.session_id.clone();

        let task = tokio::spawn(async move {
            let mut sequence: u32 = 0;
            let mut last_format = (16000, 1);

            while let Some(frame) = audio_rx.recv().await {
                let pcm_bytes: Vec<u8> =
                    frame.samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                last_format = (frame.sample_rate, frame.channels);

                let message = AudioFrameMessage {
                    session_id: session_id.clone(),
                    sequence,
                    pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
                    sample_rate: frame.sample_rate,
                    channels: frame.channels,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    final_frame: false,
                };

                if let Err(e) = publish_frame(&client, &subject, &message).await {
                    // A lost frame does not end the call
                    error!("Failed to publish audio frame: {}", e);
                }
                sequence = sequence.wrapping_add(1);
            }

            let final_marker = AudioFrameMessage {
                session_id,
                sequence,
                pcm: String::new(),
                sample_rate: last_format.0,
                channels: last_format.1,
                timestamp: chrono::Utc::now().to_rfc3339(),
                final_frame: true,
            };
            if let Err(e) = publish_frame(&client, &subject, &final_marker).await {
                error!("Failed to publish final frame marker: {}", e);
            }
        });
        self.audio_task = Some(task);
    }

    /// Let the audio forwarder publish what is queued and its final marker
    ///
    /// The forwarder finishes once the capture side closes its channel.
    async fn drain_audio(&mut self) {
        let Some(mut task) = self.audio_task.take() else {
            return;
        };
        if tokio::time::timeout(AUDIO_DRAIN_TIMEOUT, &mut task).await.is_err() {
            warn!(
                "Audio forwarder for {} did not finish within {:?}",
                self.session_id, AUDIO_DRAIN_TIMEOUT
            );
            task.abort();
        }
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..).chain(self.audio_task.take()) {
            task.abort();
        }
    }
}

async fn publish_frame(
    client: &Client,
    subject: &str,
    message: &AudioFrameMessage,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(message)?;
    client.publish(subject.to_string(), payload.into()).await?;
    Ok(())
}

#[async_trait]
impl VoiceTransport for NatsTransport {
    async fn connect(
        &mut self,
        config: &AgentCallConfig,
        audio: Option<mpsc::Receiver<AudioFrame>>,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        info!("Connecting to NATS at {} for session {}", self.url, self.session_id);

        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|e| TransportError::transient(format!("Failed to connect to NATS: {}", e)))?;

        // Subscribe before starting so the call-start event cannot be missed
        let subscriber = client
            .subscribe(self.event_subject())
            .await
            .map_err(|e| {
                TransportError::transient(format!("Failed to subscribe to events: {}", e))
            })?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.spawn_event_forwarder(subscriber, tx);

        let start = ControlMessage::Start {
            session_id: self.session_id.clone(),
            assistant: config.clone(),
        };
        if let Err(e) = Self::publish_control(&client, self.control_subject(), &start).await {
            self.abort_tasks();
            return Err(e);
        }

        if let Some(audio_rx) = audio {
            self.spawn_audio_forwarder(client.clone(), audio_rx);
        }

        self.client = Some(client);
        info!("Voice call requested for session {}", self.session_id);

        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(client) = self.client.take() else {
            self.abort_tasks();
            return Ok(());
        };

        info!("Stopping voice call for session {}", self.session_id);

        self.drain_audio().await;

        let stop = ControlMessage::Stop {
            session_id: self.session_id.clone(),
        };
        let mut result = Self::publish_control(&client, self.control_subject(), &stop).await;
        if result.is_ok() {
            result = client.flush().await.map_err(|e| {
                TransportError::transient(format!("Failed to flush NATS connection: {}", e))
            });
        }

        // Subscriptions go regardless of whether the stop reached the runtime
        self.abort_tasks();
        drop(client);

        result
    }

    fn name(&self) -> &str {
        "nats"
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Builds a `NatsTransport` per connection attempt
#[derive(Debug, Clone)]
pub struct NatsTransportFactory {
    url: String,
}

impl NatsTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl TransportFactory for NatsTransportFactory {
    fn create(&self, session_id: &str) -> Box<dyn VoiceTransport> {
        Box::new(NatsTransport::new(self.url.clone(), session_id))
    }
}
