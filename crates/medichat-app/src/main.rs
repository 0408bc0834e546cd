//! MediChat server binary.
//!
//! Composition root: tracing, configuration, the RAG client, and the HTTP
//! server with graceful Ctrl-C shutdown.

mod cli;

use std::sync::Arc;

use clap::Parser;

use medichat_api::{start_server, AppState};
use medichat_chat::RagClient;
use medichat_core::MedichatConfig;

use crate::cli::CliArgs;

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = if config_exists {
        MedichatConfig::load(&config_file)?
    } else {
        MedichatConfig::default()
    };
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting MediChat v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No config file, using defaults");
    }
    config.validate()?;

    // RAG backend.
    let client = Arc::new(RagClient::new(&config.upstream)?);
    tracing::info!(
        query_url = %config.upstream.query_url,
        stream_url = %config.upstream.stream_url,
        booking_url = %config.upstream.booking_url,
        timeout_secs = config.upstream.timeout_secs,
        "RAG client ready"
    );

    let state = AppState::new(config.clone(), client.clone(), client);
    start_server(&config, state, shutdown_signal()).await?;

    tracing::info!("MediChat stopped");
    Ok(())
}
