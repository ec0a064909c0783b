//! Main CLI parser and top-level argument handling.
//!
//! Every option can also be set through the environment variable named in
//! its `env` attribute (or a `.env` file in the working directory).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use oaibridge_core::{
    BridgeConfig, ConfigError, DEFAULT_BACKEND_URL, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

use crate::commands::Commands;

/// OpenAI-compatible gateway in front of an Ollama server.
#[derive(Debug, Parser)]
#[command(name = "oaibridge")]
#[command(about = "Serve the OpenAI chat completions API on top of Ollama")]
#[command(version)]
pub struct Cli {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Base URL of the Ollama server
    #[arg(long = "backend-url", env = "OLLAMA_BASE_URL", default_value = DEFAULT_BACKEND_URL, global = true)]
    pub backend_url: String,

    /// Model used when a request names none
    #[arg(long = "default-model", env = "DEFAULT_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub default_model: String,

    /// Backend request timeout in seconds
    #[arg(long, env = "TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, global = true)]
    pub timeout: u64,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "debug")
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Also write logs to this file
    #[arg(long = "log-file", env = "LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run; `serve` when none was given.
    pub fn selected_command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }

    /// Build and validate the gateway configuration.
    pub fn to_config(&self) -> Result<BridgeConfig, ConfigError> {
        let config = BridgeConfig::new(&self.backend_url, self.default_model.trim())?
            .with_bind(self.host.trim(), self.port)
            .with_request_timeout(Duration::from_secs(self.timeout));
        config.validate()?;
        Ok(config)
    }
}
