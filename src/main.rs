//! Colloquy - conversational assistant server
//!
//! Main entry point for the Colloquy application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use colloquy::cli::{Cli, Commands};
use colloquy::commands;
use colloquy::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    // Mirror a CLI storage path into COLLOQUY_DB so `ThreadStore::new()`
    // honors the override wherever it is constructed.
    if let Some(db_path) = &cli.storage_path {
        std::env::set_var("COLLOQUY_DB", db_path);
        tracing::info!("Using storage DB override from CLI: {}", db_path);
    }

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        Commands::Serve { host, port } => {
            tracing::info!("Starting HTTP API server");
            commands::serve::run_serve(config, host, port).await?;
            Ok(())
        }
        Commands::Chat {
            server,
            user,
            model,
            thread,
        } => {
            tracing::info!("Starting interactive chat against {}", server);
            commands::chat::run_chat(config, server, user, model, thread).await?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("colloquy=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
