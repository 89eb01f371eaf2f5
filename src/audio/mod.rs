pub mod backend;
pub mod file;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
    SourceBackendFactory,
};
pub use file::{AudioFile, WavReplayBackend};
