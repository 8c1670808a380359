//! # Connector Layer
//!
//! External integrations implementing the chat-model capability:
//! - Azure OpenAI chat completions over HTTP
//! - An offline mock model

pub mod adapter;

pub use adapter::*;
