use std::sync::Arc;

use hookrelay_agent::{HttpLlmClient, KnowledgeBase, LlmError, PipelineSettings, ReplyPipeline};
use hookrelay_core::config::{AppConfig, ConfigError, LoadOptions};
use hookrelay_platform::PlatformClient;
use thiserror::Error;
use tracing::{info, warn};

use crate::service::{RelayService, SharedService};

pub struct Application {
    pub config: Arc<AppConfig>,
    pub service: SharedService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("upstream http client could not be built: {0}")]
    UpstreamClient(#[source] reqwest::Error),
    #[error("llm client could not be built: {0}")]
    LlmClient(#[from] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = Arc::new(config);

    let outbound =
        PlatformClient::from_config(Arc::clone(&config)).map_err(BootstrapError::UpstreamClient)?;
    let llm = HttpLlmClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        llm_provider = ?llm.provider(),
        reply_mode = ?config.reply.mode,
        "upstream and llm clients initialized"
    );

    let pipeline = ReplyPipeline::new(
        Arc::new(KnowledgeBase::new(config.reply.knowledge_base_path.clone())),
        Arc::new(llm),
        Arc::new(outbound),
        PipelineSettings::from_config(&config),
    );
    let service = Arc::new(RelayService::new(Arc::clone(&config), pipeline));

    if !service.authenticator.allowlist_enabled() {
        warn!(
            event_name = "system.bootstrap.allowlist_disabled",
            correlation_id = "bootstrap",
            "webhook.allowed_ip is unset; source address check disabled"
        );
    }
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        signature_scheme = ?service.authenticator.scheme(),
        max_conversations = service.store.capacity(),
        "relay service initialized"
    );

    Ok(Application { config, service })
}
