//! CLI argument parsing using clap.

use clap::{Parser, Subcommand};

use crate::config::{Config, FileConfig};

/// Streaming chat agent with inline tool calls.
///
/// Tangent streams replies from an OpenAI-compatible endpoint and executes
/// tool-call blocks the model embeds in its output, feeding results back
/// until the model answers in plain text.
#[derive(Parser, Debug)]
#[command(name = "tangent", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default .tangent.toml in the current directory
    Init,
    /// Interactive chat session
    Chat {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// One-shot exchange: send a prompt, print the reply, exit
    Ask {
        /// The prompt to send
        #[arg(value_name = "PROMPT")]
        prompt: String,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags that override `.tangent.toml` settings.
#[derive(Parser, Debug, Default)]
pub struct Overrides {
    /// Model name
    #[arg(long, value_name = "MODEL", env = "TANGENT_MODEL")]
    pub model: Option<String>,

    /// API base URL (OpenAI-compatible)
    #[arg(long, value_name = "URL", env = "TANGENT_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum tool dispatches per user turn
    #[arg(long, value_name = "N", env = "TANGENT_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Write a raw session transcript log
    #[arg(long, env = "TANGENT_LOG")]
    pub log: bool,
}

impl Overrides {
    /// Overlay these flags on a discovered file config.
    pub fn apply(self, file: FileConfig) -> Config {
        Config {
            base_url: self.base_url.unwrap_or(file.base_url),
            model: self.model.unwrap_or(file.model),
            api_key_env: file.api_key_env,
            temperature: file.temperature,
            max_tokens: file.max_tokens,
            max_tool_depth: self.max_depth.unwrap_or(file.max_tool_depth),
            log_enabled: self.log,
        }
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
