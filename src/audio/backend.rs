use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech recognition
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms frames
        }
    }
}

/// Audio capture backend
///
/// A backend is a resource held for the lifetime of one connection attempt:
/// started at connect, stopped on every exit path.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// No local capture; the client streams audio to the voice runtime itself
    Disabled,
    /// Replay a WAV recording as if it were spoken live
    Wav(PathBuf),
}

/// Creates a backend per connection attempt
pub trait AudioBackendFactory: Send + Sync {
    fn create(&self) -> Result<Option<Box<dyn AudioBackend>>>;
}

/// Factory driven by an `AudioSource`
#[derive(Debug, Clone)]
pub struct SourceBackendFactory {
    source: AudioSource,
    config: AudioBackendConfig,
}

impl SourceBackendFactory {
    pub fn new(source: AudioSource, config: AudioBackendConfig) -> Self {
        Self { source, config }
    }

    pub fn disabled() -> Self {
        Self::new(AudioSource::Disabled, AudioBackendConfig::default())
    }
}

impl AudioBackendFactory for SourceBackendFactory {
    fn create(&self) -> Result<Option<Box<dyn AudioBackend>>> {
        match &self.source {
            AudioSource::Disabled => Ok(None),
            AudioSource::Wav(path) => {
                let backend = super::file::WavReplayBackend::open(path, self.config.clone())?;
                Ok(Some(Box::new(backend)))
            }
        }
    }
}
