//! Serve command handler
//!
//! Wires the store, provider, and orchestrator together and runs the HTTP
//! API until interrupted.

use crate::config::Config;
use crate::error::Result;
use crate::exchange::ExchangeOrchestrator;
use crate::provider::create_provider;
use crate::server::{build_router, AppState};
use crate::store::ThreadStore;
use std::sync::Arc;
use std::time::Duration;

/// Run the HTTP API server
pub async fn run_serve(
    config: Config,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<()> {
    let store = Arc::new(open_store(&config)?);
    let provider = create_provider(&config.provider)?;
    let orchestrator = Arc::new(ExchangeOrchestrator::new(
        Arc::clone(&store),
        provider,
        Duration::from_secs(config.exchange.request_timeout_seconds),
    ));

    let state = Arc::new(AppState {
        store,
        orchestrator,
        default_model: config.provider.openrouter.model.clone(),
    });

    let app = build_router(state);

    let host = host_override.unwrap_or(config.server.host);
    let port = port_override.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Open the configured thread store
pub fn open_store(config: &Config) -> Result<ThreadStore> {
    match &config.storage.db_path {
        Some(path) => ThreadStore::new_with_path(path),
        None => ThreadStore::new(),
    }
}
