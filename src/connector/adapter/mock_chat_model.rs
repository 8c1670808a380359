use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use tokio_util::sync::CancellationToken;

use crate::application::{ChatModel, MessageStream};
use crate::domain::{ChatOptions, DomainError, Message, Role, ToolInfo};

/// Offline [`ChatModel`] that replies with `mock reply: <last user message>`.
pub struct MockChatModel {
    tools: Mutex<Vec<ToolInfo>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(Vec::new()),
        }
    }

    pub fn bound_tools(&self) -> Vec<ToolInfo> {
        self.tools.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn reply(input: &[Message]) -> String {
        let last_user = input
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("mock reply: {last_user}")
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        input: &[Message],
        _options: &ChatOptions,
    ) -> Result<Message, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::cancelled());
        }
        Ok(Message::assistant(Self::reply(input)))
    }

    async fn stream(
        &self,
        cancel: &CancellationToken,
        input: &[Message],
        _options: &ChatOptions,
    ) -> Result<MessageStream, DomainError> {
        if cancel.is_cancelled() {
            return Err(DomainError::cancelled());
        }
        // Split after each space so concatenating the chunks restores the reply.
        let chunks: Vec<Result<Message, DomainError>> = Self::reply(input)
            .split_inclusive(' ')
            .map(|part| Ok(Message::assistant(part)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn bind_tools(&self, tools: &[ToolInfo]) -> Result<(), DomainError> {
        let mut bound = self
            .tools
            .lock()
            .map_err(|_| DomainError::internal("mock tool registry poisoned"))?;
        bound.extend_from_slice(tools);
        Ok(())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
