use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub agent: AgentDefaults,
    pub retry: RetryConfig,
    pub report: ReportConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

/// OpenAI-compatible chat-completions endpoint used for suggestions and reports
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl AiConfig {
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .with_context(|| format!("{} is not set", self.api_key_env))
    }
}

/// Defaults applied to every voice agent call
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    pub name: String,
    pub first_message: String,
    pub transcriber_provider: String,
    pub language: String,
    pub voice_provider: String,
    pub model_provider: String,
    pub model: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            name: "AI Medical Doctor Voice Agent".to_string(),
            first_message: "Hi there! I'm your AI Medical Assistant. I'm here to help you with your medical questions and concerns.".to_string(),
            transcriber_provider: "assembly-ai".to_string(),
            language: "en".to_string(),
            voice_provider: "playht".to_string(),
            model_provider: "openai".to_string(),
            model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.multiplier,
        )
        .context("Invalid retry configuration")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Upper bound on a single summarization call; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

impl ReportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    File { path: PathBuf },
}

impl Config {
    /// Load from a TOML file (extension optional), overridden by `MEDVOICE__*` env vars
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "medvoice")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080)?
            .set_default("nats.url", "nats://localhost:4222")?
            .set_default("ai.base_url", "https://openrouter.ai/api/v1")?
            .set_default("ai.model", "google/gemini-2.0-flash-exp:free")?
            .set_default("ai.api_key_env", "OPENROUTER_API_KEY")?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 2000)?
            .set_default("retry.multiplier", 2.0)?
            .set_default("report.timeout_secs", 60)?
            .set_default("store.kind", "memory")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MEDVOICE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}
