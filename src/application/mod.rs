//! # Application Layer
//!
//! The chat-model capability and the pipeline that composes it.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
