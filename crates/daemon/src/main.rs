use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use daemon::config::DaemonConfig;
use daemon::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration and make sure the storage root exists
    let config = DaemonConfig::from_env();
    tokio::fs::create_dir_all(&config.storage_dir).await?;
    info!("Asset storage at {:?}", config.storage_dir);

    let state = Arc::new(AppState::from_config(&config));
    let app = app(state);

    let addr = config.addr()?;
    info!("Starting daemon server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
