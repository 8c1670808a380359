mod azure_chat_model;
mod azure_openai_client;
mod mock_chat_model;

pub use azure_chat_model::*;
pub use azure_openai_client::*;
pub use mock_chat_model::*;
