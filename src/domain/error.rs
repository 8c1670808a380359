use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("azure openai error status={status} body={body}")]
    Protocol { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("no choices returned")]
    NoChoices,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// The in-flight exchange was aborted through its cancellation token.
    pub fn cancelled() -> Self {
        Self::Transport("request cancelled".to_string())
    }

    pub fn protocol(status: u16, body: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            body: body.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn invalid_pipeline(msg: impl Into<String>) -> Self {
        Self::InvalidPipeline(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn is_no_choices(&self) -> bool {
        matches!(self, Self::NoChoices)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    pub fn is_invalid_pipeline(&self) -> bool {
        matches!(self, Self::InvalidPipeline(_))
    }
}
