//! Risk Server - cross-sell risk inference service
//!
//! Loads the exported model artifacts once, then serves health and
//! predict requests over HTTP until interrupted.

use anyhow::{Context, Result};
use inference_lib::{ArtifactStore, PredictionService, StructuredLogger};
use risk_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting risk-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        artifacts_dir = %config.artifacts_dir.display(),
        "Server configured"
    );

    let logger = StructuredLogger::new(&config.instance_name);

    // Artifacts must load before the listener is bound
    let store = ArtifactStore::load(&config.artifact_paths())
        .map_err(|e| {
            error!(error = %e, "Failed to load model artifacts");
            e
        })
        .context("Refusing to start without model artifacts")?;
    info!(loaded_at = %store.loaded_at(), "Model artifacts ready");

    let service = PredictionService::new(store, logger.clone());
    let app_state = Arc::new(api::AppState::new(service));

    let bind_addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &bind_addr);

    let shutdown_logger = logger.clone();
    api::serve(&bind_addr, app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
