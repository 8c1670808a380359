pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{Chain, ChatModel, ChatModelStage, LambdaStage, MessageStream, Runnable, Stage};

pub use connector::{AzureChatModel, AzureOpenAiClient, MockChatModel};

pub use domain::{ChatOptions, ClientConfig, DomainError, Message, Role, ToolInfo};
