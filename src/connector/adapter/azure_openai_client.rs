use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{ClientConfig, DomainError, Message};

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
}

impl<'a> ApiRequest<'a> {
    fn from_messages(messages: &'a [Message], max_tokens: u32) -> Self {
        Self {
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens,
        }
    }
}

#[derive(serde::Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Subset of the chat-completions response we consume. Everything else is
/// ignored; a missing `choices` array decodes as empty.
#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for the Azure OpenAI chat-completions API.
///
/// Each call issues exactly one `POST` to
/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`.
/// The underlying `reqwest::Client` applies the configured total timeout and
/// owns the connection pool; clones share it and may be used concurrently.
///
/// The API key only ever leaves the process in the `api-key` header.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `messages` and return the content of the first choice.
    ///
    /// Failure order: configuration, transport (including cancellation and
    /// timeout), non-2xx status, decode, empty choices.
    pub async fn call_chat_completion(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
    ) -> Result<String, DomainError> {
        self.config.validate()?;

        let url = self.config.chat_completions_url();
        let request = ApiRequest::from_messages(messages, self.config.max_tokens);
        let body = serde_json::to_vec(&request)
            .map_err(|e| DomainError::internal(format!("failed to encode request: {e}")))?;

        debug!(
            "AzureOpenAiClient: POST {url} ({} messages, deployment {})",
            messages.len(),
            self.config.deployment
        );

        let mut builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if self.config.has_api_key() {
            builder = builder.header("api-key", &self.config.api_key);
        }
        let request = builder
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build request: {e}")))?;

        let exchange = async {
            let response = self
                .client
                .execute(request)
                .await
                .map_err(|e| self.transport_error(e))?;
            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(e))?;
            Ok::<_, DomainError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("AzureOpenAiClient: request cancelled");
                return Err(DomainError::cancelled());
            }
            result = exchange => result?,
        };

        debug!("AzureOpenAiClient: API returned {status}");

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!("AzureOpenAiClient: API returned {status}: {body}");
            return Err(DomainError::protocol(status.as_u16(), body));
        }

        let api_response: ApiResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::decode(format!("failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or(DomainError::NoChoices)?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn transport_error(&self, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::transport(format!(
                "request timed out after {}s",
                self.config.timeout.as_secs_f64()
            ))
        } else {
            DomainError::transport(format!("request failed: {e}"))
        }
    }
}
