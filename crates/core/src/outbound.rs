use async_trait::async_trait;

use crate::errors::ApplicationError;

/// Delivers a reply into an upstream conversation.
#[async_trait]
pub trait OutboundReply: Send + Sync {
    async fn send_reply(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), ApplicationError>;
}
