use std::ffi::OsString;
use std::time::Duration;

use clap::Parser;

use crate::domain::{ClientConfig, DEFAULT_API_VERSION, DEFAULT_MAX_TOKENS};

pub const DEFAULT_PROMPT: &str = "Say hello to Eino via AzureOpenAI GPT-5-mini";

/// Long flags that may also be written with a single dash (`-endpoint x`).
const SINGLE_DASH_FLAGS: &[&str] = &[
    "endpoint",
    "deployment",
    "apikey",
    "timeout",
    "api-version",
    "max-tokens",
    "prompt",
    "mock-model",
    "verbose",
];

/// Long flags whose value may be given as the next argument.
const VALUE_FLAGS: &[&str] = &[
    "endpoint",
    "deployment",
    "apikey",
    "timeout",
    "api-version",
    "max-tokens",
    "prompt",
];

#[derive(Debug, Parser)]
#[command(name = "azchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long)]
    pub verbose: bool,

    /// Base URL of the Azure OpenAI resource (scheme + host)
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", default_value = "")]
    pub endpoint: String,

    /// Deployment name to route the request to
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT", default_value = "")]
    pub deployment: String,

    /// API key sent in the `api-key` header; omitted when empty
    #[arg(long, env = "AZURE_OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub apikey: String,

    /// Request timeout in whole seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_tokens: u32,

    /// User message sent to the model
    #[arg(long, default_value = DEFAULT_PROMPT, allow_hyphen_values = true)]
    pub prompt: String,

    /// Answer with the offline mock model instead of calling Azure
    #[arg(long)]
    pub mock_model: bool,
}

impl Cli {
    /// Parse process arguments, accepting single-dash long flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            &self.endpoint,
            &self.deployment,
            &self.apikey,
            Duration::from_secs(self.timeout),
        )
        .with_api_version(&self.api_version)
        .with_max_tokens(self.max_tokens)
    }
}

/// Rewrite `-name` / `-name=value` to `--name` / `--name=value` for known
/// long flags. The value following a flag that takes one is passed through
/// as is, and so is everything after `--`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    let mut value_pending = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| {
            if passthrough || std::mem::take(&mut value_pending) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            // Accept both `-name` and `--name` when deciding if a value follows.
            let long = rest.strip_prefix('-').unwrap_or(rest);
            let (name, inline_value) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            value_pending = !inline_value && VALUE_FLAGS.contains(&name);

            if !rest.starts_with('-') && SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}
