use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::domain::{ChatOptions, DomainError, Message, ToolInfo};

/// Incrementally decoded assistant output.
pub type MessageStream = BoxStream<'static, Result<Message, DomainError>>;

/// The capability set a chat model must provide to be used as a pipeline stage.
///
/// Implementors encapsulate transport, serialization and vendor-specific API
/// details. Consumers (e.g. [`crate::application::Chain`]) stay decoupled from
/// any particular provider or HTTP client library.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce one assistant message for the conversation.
    ///
    /// Cancelling `cancel` aborts any in-flight work and fails the call.
    async fn generate(
        &self,
        cancel: &CancellationToken,
        input: &[Message],
        options: &ChatOptions,
    ) -> Result<Message, DomainError>;

    /// Produce the assistant message as a sequence of partial messages.
    ///
    /// Implementors without incremental decoding return
    /// [`DomainError::Unsupported`].
    async fn stream(
        &self,
        cancel: &CancellationToken,
        input: &[Message],
        options: &ChatOptions,
    ) -> Result<MessageStream, DomainError>;

    /// Make `tools` available to subsequent calls.
    fn bind_tools(&self, tools: &[ToolInfo]) -> Result<(), DomainError>;

    /// Human-readable identifier used in logs.
    fn model_name(&self) -> &str;
}
