use std::sync::Arc;
use std::time::Duration;

use hookrelay_agent::ReplyPipeline;
use hookrelay_core::config::AppConfig;
use hookrelay_core::{ConversationStore, Notifier};
use hookrelay_platform::Authenticator;
use tokio_util::task::TaskTracker;

/// Process-wide state shared by every handler.
pub struct RelayService {
    pub config: Arc<AppConfig>,
    pub store: ConversationStore,
    pub notifier: Notifier,
    pub authenticator: Authenticator,
    pub pipeline: ReplyPipeline,
    /// Detached reply tasks spawned by the webhook handler.
    pub tasks: TaskTracker,
}

impl RelayService {
    pub fn new(config: Arc<AppConfig>, pipeline: ReplyPipeline) -> Self {
        Self {
            store: ConversationStore::new(config.store.max_conversations),
            notifier: Notifier::new(config.notify.channel_capacity),
            authenticator: Authenticator::from_config(&config.webhook),
            pipeline,
            tasks: TaskTracker::new(),
            config,
        }
    }

    /// Waits for in-flight reply tasks. Returns `false` if `within` elapsed first.
    pub async fn drain_tasks(&self, within: Duration) -> bool {
        self.tasks.close();
        tokio::time::timeout(within, self.tasks.wait()).await.is_ok()
    }
}

pub type SharedService = Arc<RelayService>;
