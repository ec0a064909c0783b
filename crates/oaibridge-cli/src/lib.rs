//! `oaibridge` command-line interface.
//!
//! The binary is the composition root: it turns flags and environment
//! variables into a `BridgeConfig`, builds the Ollama backend and hands both
//! to the gateway.

pub mod commands;
pub mod handlers;
pub mod logging;
pub mod parser;

pub use commands::Commands;
pub use parser::Cli;
