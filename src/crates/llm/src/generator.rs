//! The text-generation seam.

use crate::error::Result;
use crate::message::ChatMessage;
use async_trait::async_trait;

/// Anything that turns a role-tagged conversation into a single completion.
///
/// Implementations must be cheap to share across tasks; callers hold them as
/// `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the conversation.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Name of the model this generator talks to.
    fn model(&self) -> &str;
}
