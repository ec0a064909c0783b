//! Serve command handler.

use std::sync::Arc;

use anyhow::{Context, Result};
use oaibridge_core::BridgeConfig;
use oaibridge_ollama::OllamaClient;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Execute the serve command.
///
/// Binds the configured address and runs the gateway until Ctrl-C.
pub async fn execute(config: BridgeConfig) -> Result<()> {
    let backend = OllamaClient::from_config(&config).context("Failed to build backend client")?;
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    oaibridge_proxy::serve(listener, Arc::new(config), Arc::new(backend), cancel).await
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Failed to listen for Ctrl-C, shutting down: {e}"),
    }
    cancel.cancel();
}
