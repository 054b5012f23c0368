use std::sync::Arc;
use std::time::Duration;

use hookrelay_core::config::{AppConfig, ReplyMode};
use hookrelay_core::{ApplicationError, OutboundReply};
use tracing::{info, warn};

use crate::knowledge::{KnowledgeBase, KnowledgeState};
use crate::llm::LlmClient;
use crate::prompt::build_prompt;

pub const APOLOGY_REPLY: &str =
    "Üzgünüz, şu anda yanıt veremiyoruz. Lütfen daha sonra tekrar deneyin.";
pub const KNOWLEDGE_UNAVAILABLE_REPLY: &str =
    "Bilgi bankasına şu anda ulaşılamıyor. Bir temsilcimiz size en kısa sürede dönüş yapacak.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    /// Set when `text` is a fixed fallback rather than a generated answer.
    pub degraded: bool,
}

impl Suggestion {
    fn generated(text: String) -> Self {
        Self { text, degraded: false }
    }

    fn fallback(text: &str) -> Self {
        Self { text: text.to_string(), degraded: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub suggestion: String,
    pub degraded: bool,
    pub auto_sent: bool,
    pub send_error: Option<ApplicationError>,
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub mode: ReplyMode,
    pub language: String,
    pub max_knowledge_chars: usize,
    pub llm_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: config.reply.mode,
            language: config.reply.language.clone(),
            max_knowledge_chars: config.reply.max_knowledge_chars,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

/// Turns a customer message into a suggestion and, in auto-reply mode,
/// posts it back to the conversation.
pub struct ReplyPipeline {
    knowledge: Arc<KnowledgeBase>,
    llm: Arc<dyn LlmClient>,
    outbound: Arc<dyn OutboundReply>,
    settings: PipelineSettings,
}

impl ReplyPipeline {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        llm: Arc<dyn LlmClient>,
        outbound: Arc<dyn OutboundReply>,
        settings: PipelineSettings,
    ) -> Self {
        Self { knowledge, llm, outbound, settings }
    }

    pub fn mode(&self) -> ReplyMode {
        self.settings.mode
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    /// Never fails: provider and knowledge problems degrade to fixed text.
    pub async fn produce_suggestion(&self, conversation_id: &str, user_message: &str) -> Suggestion {
        let knowledge = match self.knowledge.load().await {
            KnowledgeState::Loaded(text) => text.clone(),
            KnowledgeState::Unavailable(_) => {
                return Suggestion::fallback(KNOWLEDGE_UNAVAILABLE_REPLY);
            }
        };

        let prompt = build_prompt(
            &knowledge,
            user_message,
            &self.settings.language,
            self.settings.max_knowledge_chars,
        );

        match tokio::time::timeout(self.settings.llm_timeout, self.llm.complete(&prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Suggestion::generated(text.trim().to_string()),
            Ok(Ok(_)) => {
                self.log_provider_failure(conversation_id, "empty completion");
                Suggestion::fallback(APOLOGY_REPLY)
            }
            Ok(Err(error)) => {
                self.log_provider_failure(conversation_id, &error.to_string());
                Suggestion::fallback(APOLOGY_REPLY)
            }
            Err(_) => {
                self.log_provider_failure(conversation_id, "completion timed out");
                Suggestion::fallback(APOLOGY_REPLY)
            }
        }
    }

    pub async fn handle(&self, conversation_id: &str, user_message: &str) -> ReplyOutcome {
        let suggestion = self.produce_suggestion(conversation_id, user_message).await;

        let mut outcome = ReplyOutcome {
            suggestion: suggestion.text,
            degraded: suggestion.degraded,
            auto_sent: false,
            send_error: None,
        };

        if self.settings.mode != ReplyMode::AutoReply || outcome.degraded {
            return outcome;
        }

        match self.outbound.send_reply(conversation_id, &outcome.suggestion).await {
            Ok(()) => {
                outcome.auto_sent = true;
                info!(
                    event_name = "agent.reply.auto_sent",
                    conversation_id = %conversation_id,
                    "suggestion sent to customer"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "agent.reply.send_failed",
                    conversation_id = %conversation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "auto reply could not be delivered"
                );
                outcome.send_error = Some(error);
            }
        }
        outcome
    }

    fn log_provider_failure(&self, conversation_id: &str, reason: &str) {
        let error = ApplicationError::Generative(reason.to_string());
        warn!(
            event_name = "agent.suggestion.degraded",
            conversation_id = %conversation_id,
            error_class = error.error_class(),
            error = %error,
            "generative provider failed; returning apology"
        );
    }
}
