use std::time::Duration;

use crate::domain::DomainError;

pub const DEFAULT_API_VERSION: &str = "2025-04-01-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an Azure OpenAI chat deployment.
///
/// Immutable once handed to a client. `Debug` never prints the API key.
#[derive(Clone)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub deployment: String,
    /// Sent as the `api-key` header when non-empty.
    pub api_key: String,
    /// Total bound on one request/response exchange.
    pub timeout: Duration,
    pub api_version: String,
    pub max_tokens: u32,
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_key: api_key.into(),
            timeout,
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Construct from environment variables:
    ///
    /// | Variable                   | Default              |
    /// |----------------------------|----------------------|
    /// | `AZURE_OPENAI_ENDPOINT`    | `""`                 |
    /// | `AZURE_OPENAI_DEPLOYMENT`  | `""`                 |
    /// | `AZURE_OPENAI_API_KEY`     | `""`                 |
    /// | `AZURE_OPENAI_API_VERSION` | `2025-04-01-preview` |
    pub fn from_env() -> Self {
        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").unwrap_or_default();
        let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT").unwrap_or_default();
        let api_key = std::env::var("AZURE_OPENAI_API_KEY").unwrap_or_default();
        let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        Self::new(endpoint, deployment, api_key, DEFAULT_TIMEOUT).with_api_version(api_version)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Endpoint and deployment are only checked when a request is about to be
    /// made, so a half-configured client can still be built and composed.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.endpoint.is_empty() || self.deployment.is_empty() {
            return Err(DomainError::configuration("endpoint or deployment not set"));
        }
        Ok(())
    }

    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "" })
            .field("timeout", &self.timeout)
            .field("api_version", &self.api_version)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
