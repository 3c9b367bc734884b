//! Imagery relay HTTP server.
//!
//! Binds the listener first, then initializes the imagery client in the
//! background. Until that finishes every endpoint except `/health` answers
//! `503`. An initialization failure stops the process.
//!
//! # Usage
//!
//! ```bash
//! # Seeded in-memory imagery service (default without credentials)
//! cargo run --bin imagery-relay-server
//!
//! # Remote imagery service
//! CREDENTIALS_PATH=/secrets/service-account.json \
//!   cargo run --bin imagery-relay-server
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_CONFIG`: Path to a TOML config file
//! - `HOST` / `PORT`: Bind address (default: 0.0.0.0:5000)
//! - `IMAGERY_SERVICE`: `local` or `remote`
//! - `CREDENTIALS_PATH`: Service-account key for the remote service
//! - `RUST_LOG`: Log filter (default: info)

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use imagery_relay::config::ServiceConfig;
use imagery_relay::http::{create_router, AppState};
use imagery_relay::remote::ServiceFactory;
use imagery_relay::services::ImageryContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting imagery relay");

    let config = ServiceConfig::load()?;
    let addr = config.bind_addr()?;

    let state = AppState::uninitialized();
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    tokio::spawn(async move {
        match ServiceFactory::create(&config).await {
            Ok(service) => {
                info!(service = service.name(), "Imagery service initialized");
                state.mark_ready(ImageryContext::new(service, &config));
            }
            Err(e) => {
                error!("Failed to initialize imagery service: {}", e);
                std::process::exit(1);
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
