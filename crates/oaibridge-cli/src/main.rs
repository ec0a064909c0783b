//! CLI entry point - the composition root.

use clap::Parser;

use oaibridge_cli::{Cli, Commands, handlers, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = logging::init_tracing(&cli.log_level, cli.log_file.as_deref());

    let config = cli.to_config()?;
    tracing::debug!(?config, "Resolved configuration");

    match cli.selected_command() {
        Commands::Serve => handlers::serve::execute(config).await,
        Commands::Check => handlers::check::execute(config).await,
    }
}
