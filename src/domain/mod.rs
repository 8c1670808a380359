//! # Domain Layer
//!
//! Conversation model, client configuration and the error taxonomy.
//! This layer is independent of any HTTP stack or runtime.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
