use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookrelay_agent::{KnowledgeBase, LlmClient, PipelineSettings, ReplyPipeline};
use hookrelay_core::config::{AppConfig, ReplyMode, SignatureScheme};
use hookrelay_core::{ApplicationError, OutboundReply};
use tokio::sync::{Mutex, Notify};

use crate::service::{RelayService, SharedService};

pub const WEBHOOK_SECRET: &str = "whsec-test";
pub const SUGGESTION: &str = "Pazartesi 09:00-17:00";

pub struct FixedLlm;

#[async_trait]
impl LlmClient for FixedLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(SUGGESTION.to_string())
    }
}

/// Answers only after `release` is called.
#[derive(Default)]
pub struct GatedLlm {
    gate: Notify,
}

impl GatedLlm {
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl LlmClient for GatedLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        self.gate.notified().await;
        Ok(SUGGESTION.to_string())
    }
}

/// Never answers.
pub struct HangingLlm;

#[async_trait]
impl LlmClient for HangingLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct RecordingOutbound {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingOutbound {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl OutboundReply for RecordingOutbound {
    async fn send_reply(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), ApplicationError> {
        self.sent.lock().await.push((conversation_id.to_string(), content.to_string()));
        Ok(())
    }
}

pub struct TestRelay {
    pub service: SharedService,
    pub outbound: Arc<RecordingOutbound>,
}

impl TestRelay {
    pub fn builder() -> TestRelayBuilder {
        TestRelayBuilder::default()
    }
}

#[derive(Default)]
pub struct TestRelayBuilder {
    allowed_ip: Option<String>,
    scheme: Option<SignatureScheme>,
    mode: Option<ReplyMode>,
    knowledge_path: Option<PathBuf>,
    llm: Option<Arc<dyn LlmClient>>,
    task_timeout_secs: Option<u64>,
    llm_timeout: Option<Duration>,
}

impl TestRelayBuilder {
    pub fn allowed_ip(mut self, address: &str) -> Self {
        self.allowed_ip = Some(address.to_string());
        self
    }

    pub fn scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn mode(mut self, mode: ReplyMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn knowledge_path(mut self, path: PathBuf) -> Self {
        self.knowledge_path = Some(path);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn task_timeout_secs(mut self, secs: u64) -> Self {
        self.task_timeout_secs = Some(secs);
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> TestRelay {
        let mut config = AppConfig::default();
        config.webhook.secret = WEBHOOK_SECRET.to_string().into();
        config.webhook.allowed_ip = self.allowed_ip;
        config.webhook.signature_scheme = self.scheme.unwrap_or(SignatureScheme::ChannelHmac);
        config.reply.mode = self.mode.unwrap_or(ReplyMode::Assist);
        config.reply.task_timeout_secs = self.task_timeout_secs.unwrap_or(5);
        let config = Arc::new(config);

        let knowledge = match self.knowledge_path {
            Some(path) => KnowledgeBase::new(path),
            None => KnowledgeBase::from_text("Dr. Ayşe works Mondays 09:00-17:00"),
        };
        let outbound = Arc::new(RecordingOutbound::default());
        let mut settings = PipelineSettings::from_config(&config);
        settings.llm_timeout = self.llm_timeout.unwrap_or(Duration::from_secs(2));
        let llm: Arc<dyn LlmClient> = match self.llm {
            Some(llm) => llm,
            None => Arc::new(FixedLlm),
        };
        let pipeline = ReplyPipeline::new(Arc::new(knowledge), llm, outbound.clone(), settings);

        TestRelay { service: Arc::new(RelayService::new(config, pipeline)), outbound }
    }
}
