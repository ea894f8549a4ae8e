use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Cross-messenger port.
///
/// Handlers reply through this instead of talking to the platform SDK directly.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Deleting a message that is already gone is not an error.
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}
