//! Conference Server - Main entry point

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use conference_core::{
    api::{self, AppState, ConferenceService},
    config::Config,
    datastore::Datastore,
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize observability
    observability::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Conference Server"
    );

    // Wire up the datastore and service
    let datastore = Arc::new(Datastore::new(config.datastore.clone()));
    let service = ConferenceService::new(datastore);

    // Build router
    let app = api::build_router(AppState { service });

    // Start server
    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
