//! Check command handler.
//!
//! Probes the backend the gateway would talk to and prints what it serves.

use anyhow::{Context, Result};
use oaibridge_core::{BridgeConfig, InferenceBackend};
use oaibridge_ollama::OllamaClient;

/// Execute the check command.
///
/// Fails (non-zero exit) when the backend does not answer.
pub async fn execute(config: BridgeConfig) -> Result<()> {
    let backend = OllamaClient::from_config(&config).context("Failed to build backend client")?;

    println!("Backend: {}", backend.base_url());
    let version = backend
        .version()
        .await
        .with_context(|| format!("Backend at {} is not reachable", backend.base_url()))?;
    println!("Version: {version}");

    let models = backend
        .list_models()
        .await
        .context("Failed to list backend models")?;
    println!("Models:  {}", models.len());

    let mut default_found = false;
    for model in &models {
        if is_default_model(&model.name, &config.default_model) {
            default_found = true;
            println!("  - {} (default)", model.name);
        } else {
            println!("  - {}", model.name);
        }
    }

    if !default_found {
        println!(
            "Warning: default model '{}' is not available on the backend",
            config.default_model
        );
    }

    Ok(())
}

/// Ollama resolves a bare name to its `:latest` tag.
fn is_default_model(name: &str, default_model: &str) -> bool {
    name == default_model || name.strip_suffix(":latest") == Some(default_model)
}
