use serde::{Deserialize, Serialize};

use crate::config::AgentDefaults;
use crate::specialist::Specialist;

/// Assistant configuration sent to the voice runtime when a call starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCallConfig {
    pub name: String,
    pub first_message: String,
    pub transcriber: TranscriberConfig,
    pub voice: VoiceConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriberConfig {
    pub provider: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl AgentCallConfig {
    /// Persona, voice and system prompt come from the specialist; providers from defaults
    pub fn for_specialist(specialist: &Specialist, defaults: &AgentDefaults) -> Self {
        Self {
            name: defaults.name.clone(),
            first_message: defaults.first_message.clone(),
            transcriber: TranscriberConfig {
                provider: defaults.transcriber_provider.clone(),
                language: defaults.language.clone(),
            },
            voice: VoiceConfig {
                provider: defaults.voice_provider.clone(),
                voice_id: specialist.voice_id.clone(),
            },
            model: ModelConfig {
                provider: defaults.model_provider.clone(),
                model: defaults.model.clone(),
                messages: vec![PromptMessage {
                    role: "system".to_string(),
                    content: specialist.agent_prompt.clone(),
                }],
            },
        }
    }
}
