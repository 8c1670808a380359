use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use azchat::cli::Cli;
use azchat::{AzureChatModel, AzureOpenAiClient, Chain, ChatModel, Message, MockChatModel};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // RUST_LOG wins over --verbose when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let model: Arc<dyn ChatModel> = if cli.mock_model {
        info!("Using mock chat model");
        Arc::new(MockChatModel::new())
    } else {
        let config = cli.client_config();
        info!(
            "Using Azure OpenAI deployment '{}' at {} (timeout {}s)",
            config.deployment, config.endpoint, cli.timeout
        );
        Arc::new(AzureChatModel::new(AzureOpenAiClient::new(config)))
    };

    let runnable = Chain::<Vec<Message>, Message>::new()
        .append_chat_model(model)
        .compile()
        .context("compile error")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    let input = vec![Message::user(cli.prompt)];
    let output = runnable
        .invoke(&cancel, input)
        .await
        .context("invoke error")?;

    println!("Model output:\n{}", output.content);

    Ok(())
}
