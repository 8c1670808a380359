mod chat_options;
mod client_config;
mod message;
mod tool;

pub use chat_options::*;
pub use client_config::*;
pub use message::*;
pub use tool::*;
