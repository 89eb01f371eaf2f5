use async_trait::async_trait;
use std::sync::Arc;

use super::ReportRequest;
use crate::ai::{CompletionError, CompletionService};

const REPORT_PROMPT: &str = r#"You are an AI Medical Voice Agent that just finished a voice conversation with a user. Based on the doctor agent info and the conversation, generate a structured report with these fields:
sessionId, agent (the specialist name), user (patient name or "Anonymous"), timestamp (ISO date),
chiefComplaint (one sentence), summary (2-3 sentences), symptoms (list), duration, severity (mild, moderate or severe),
medicationsMentioned (list), recommendations (list).
Return only a JSON object with exactly these fields and nothing else."#;

/// Turns a report request into the raw structured answer
#[async_trait]
pub trait SummarizationService: Send + Sync {
    async fn summarize(&self, request: &ReportRequest) -> Result<String, CompletionError>;
}

/// Summarizer backed by a chat-completion service
pub struct CompletionSummarizer {
    completion: Arc<dyn CompletionService>,
}

impl CompletionSummarizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl SummarizationService for CompletionSummarizer {
    async fn summarize(&self, request: &ReportRequest) -> Result<String, CompletionError> {
        let agent_info = serde_json::to_string(&request.specialist)
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        let conversation = serde_json::to_string(&request.conversation)
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let user = format!(
            "Session: {}\nAI Doctor Agent Info: {}\nConversation: {}",
            request.session_id, agent_info, conversation
        );

        self.completion.complete(REPORT_PROMPT, &user).await
    }
}
