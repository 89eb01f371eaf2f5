// Integration tests for WAV loading and replay
//
// Fixtures are generated into a temp directory with hound.

use anyhow::Result;
use medvoice::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioSource,
    SourceBackendFactory, WavReplayBackend,
};
use std::path::{Path, PathBuf};

fn write_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> Result<PathBuf> {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(path)
}

fn small_frames() -> AudioBackendConfig {
    AudioBackendConfig {
        target_sample_rate: 16000,
        target_channels: 1,
        buffer_duration_ms: 10,
    }
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let samples: Vec<i16> = (0..16000).map(|i| (i % 100) as i16).collect();
    let path = write_wav(dir.path(), "one-second.wav", 16000, 1, &samples)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 16000);
    assert!((audio.duration_seconds - 1.0).abs() < 1e-9);
    assert!(audio.path.contains("one-second.wav"));
    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let result = AudioFile::open("/nonexistent/path/to/audio.wav");
    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_stereo_48khz_converts_to_mono_16khz() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // Interleaved L/R pairs; each pair averages to its index
    let samples: Vec<i16> = (0..48i16).flat_map(|i| [i - 10, i + 10]).collect();
    let path = write_wav(dir.path(), "stereo.wav", 48000, 2, &samples)?;

    let audio = AudioFile::open(&path)?;
    let converted = audio.converted(16000, 1)?;

    assert_eq!(converted.len(), 16);
    assert_eq!(&converted[..4], &[0, 3, 6, 9]);
    Ok(())
}

#[test]
fn test_conversion_is_identity_for_target_format() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let samples = vec![1i16, -2, 3, -4];
    let path = write_wav(dir.path(), "mono.wav", 16000, 1, &samples)?;

    let converted = AudioFile::open(&path)?.converted(16000, 1)?;
    assert_eq!(converted, samples);
    Ok(())
}

#[test]
fn test_non_integer_resample_ratio_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_wav(dir.path(), "cd.wav", 44100, 1, &[0i16; 441])?;

    let result = AudioFile::open(&path)?.converted(16000, 1);
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_replay_backend_streams_frames() -> Result<()> {
    let samples: Vec<i16> = (0..400).collect();
    let mut backend = WavReplayBackend::from_samples(samples, small_frames());

    let mut rx = backend.start().await?;
    assert!(backend.start().await.is_err(), "second start should fail");

    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }

    // 10ms at 16kHz mono = 160 samples per frame
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].samples.len(), 160);
    assert_eq!(frames[2].samples.len(), 80);
    assert_eq!(frames[1].timestamp_ms, 10);
    assert_eq!(frames[1].samples[0], 160);

    backend.stop().await?;
    assert!(!backend.is_capturing());
    Ok(())
}

#[tokio::test]
async fn test_source_factory() -> Result<()> {
    assert!(SourceBackendFactory::disabled().create()?.is_none());

    let dir = tempfile::tempdir()?;
    let path = write_wav(dir.path(), "replay.wav", 16000, 1, &[0i16; 1600])?;
    let factory = SourceBackendFactory::new(AudioSource::Wav(path), small_frames());
    let backend = factory.create()?.expect("wav source should produce a backend");
    assert_eq!(backend.name(), "wav-replay");

    let missing = SourceBackendFactory::new(
        AudioSource::Wav(dir.path().join("missing.wav")),
        small_frames(),
    );
    assert!(missing.create().is_err());
    Ok(())
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.target_sample_rate, 16000);
    assert_eq!(config.target_channels, 1);
    assert_eq!(config.buffer_duration_ms, 100);
}
