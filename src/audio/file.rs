use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Convert to the target format: stereo → mono by averaging, then decimation
    ///
    /// Only integer downsampling ratios are supported.
    pub fn converted(&self, target_rate: u32, target_channels: u16) -> Result<Vec<i16>> {
        let mut samples = self.samples.clone();
        let mut channels = self.channels;

        if channels != target_channels {
            if channels == 2 && target_channels == 1 {
                samples = samples
                    .chunks_exact(2)
                    .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
                    .collect();
                channels = 1;
            } else {
                anyhow::bail!(
                    "Unsupported channel conversion: {} -> {}",
                    channels,
                    target_channels
                );
            }
        }

        if self.sample_rate != target_rate {
            if target_rate == 0 || self.sample_rate % target_rate != 0 {
                anyhow::bail!(
                    "Cannot resample {}Hz to {}Hz (integer ratios only)",
                    self.sample_rate,
                    target_rate
                );
            }
            let ratio = (self.sample_rate / target_rate) as usize;
            let ch = channels as usize;
            samples = samples
                .chunks_exact(ch)
                .step_by(ratio)
                .flatten()
                .copied()
                .collect();
        }

        Ok(samples)
    }
}

/// Replays a WAV recording in real time as captured audio
pub struct WavReplayBackend {
    samples: Vec<i16>,
    config: AudioBackendConfig,
    task: Option<JoinHandle<()>>,
}

impl WavReplayBackend {
    pub fn open(path: impl AsRef<Path>, config: AudioBackendConfig) -> Result<Self> {
        let file = AudioFile::open(path)?;
        let samples = file.converted(config.target_sample_rate, config.target_channels)?;
        Ok(Self::from_samples(samples, config))
    }

    pub fn from_samples(samples: Vec<i16>, config: AudioBackendConfig) -> Self {
        Self {
            samples,
            config,
            task: None,
        }
    }

    fn samples_per_frame(&self) -> usize {
        let per_second = self.config.target_sample_rate as u64 * self.config.target_channels as u64;
        ((per_second * self.config.buffer_duration_ms) / 1000).max(1) as usize
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavReplayBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            anyhow::bail!("Replay already started");
        }

        let (tx, rx) = mpsc::channel(32);
        let frame_len = self.samples_per_frame();
        let samples = self.samples.clone();
        let sample_rate = self.config.target_sample_rate;
        let channels = self.config.target_channels;
        let frame_ms = self.config.buffer_duration_ms;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));
            for (index, chunk) in samples.chunks(frame_len).enumerate() {
                ticker.tick().await;
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms: index as u64 * frame_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("Replay finished");
        });

        self.task = Some(task);
        info!("Replaying {} samples as captured audio", self.samples.len());
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        "wav-replay"
    }
}

impl Drop for WavReplayBackend {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
