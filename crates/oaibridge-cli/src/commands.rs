//! Subcommands of the `oaibridge` binary.

use clap::Subcommand;

/// Available commands. Running without one is the same as `serve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Run the OpenAI-compatible gateway (default)
    Serve,

    /// Probe the backend and list its models, then exit
    Check,
}
