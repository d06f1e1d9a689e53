use crate::error::GatewayError;
use crate::model::{Message, SessionKey};
use async_trait::async_trait;

/// Stateless chat-completion capability.
///
/// Every call receives the full ordered history; implementations keep no per-session state.
/// `key` identifies the player to the remote service and must not affect the reply.
#[async_trait]
pub trait CompletionGateway: Send + Sync + 'static {
    async fn complete(&self, key: &SessionKey, messages: &[Message])
        -> Result<String, GatewayError>;
}
