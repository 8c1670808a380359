use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::{ChatModel, MessageStream};
use crate::connector::adapter::AzureOpenAiClient;
use crate::domain::{ChatOptions, DomainError, Message, ToolInfo};

/// [`ChatModel`] backed by an Azure OpenAI deployment.
///
/// Only `generate` talks to the service. Per-call options are ignored, the
/// deployment's own settings apply.
pub struct AzureChatModel {
    client: AzureOpenAiClient,
}

impl AzureChatModel {
    pub fn new(client: AzureOpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatModel for AzureChatModel {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        input: &[Message],
        options: &ChatOptions,
    ) -> Result<Message, DomainError> {
        if !options.is_empty() {
            debug!("AzureChatModel: ignoring per-call options {options:?}");
        }
        let text = self.client.call_chat_completion(cancel, input).await?;
        Ok(Message::assistant(text))
    }

    async fn stream(
        &self,
        _cancel: &CancellationToken,
        _input: &[Message],
        _options: &ChatOptions,
    ) -> Result<MessageStream, DomainError> {
        Err(DomainError::unsupported("stream not implemented"))
    }

    fn bind_tools(&self, tools: &[ToolInfo]) -> Result<(), DomainError> {
        debug!("AzureChatModel: bind_tools called with {} tool(s), ignoring", tools.len());
        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.client.config().deployment
    }
}
