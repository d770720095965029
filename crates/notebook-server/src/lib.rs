//! Notebook store HTTP server.
//!
//! Serves the catalog, admin panel, auth and per-session cart APIs under
//! `/api`, plus uploaded images under `/uploads`.
//!
//! ```no_run
//! use notebook_server::config::ServerConfig;
//!
//! # async fn start() -> anyhow::Result<()> {
//! let config = ServerConfig::resolve(None)?;
//! notebook_server::run(config).await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod seed;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

use config::ServerConfig;
use state::AppState;

pub use routes::build_router;

/// How often idle rate-limit buckets and carts are dropped.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// Carts untouched this long leave memory. Their items stay stored.
const CART_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Bind, serve until Ctrl+C or SIGTERM, then drain.
pub async fn run(config: ServerConfig) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    info!(environment = config.server.environment.as_str(), "Initializing state...");
    let state = AppState::new(config)?;

    let limiter = state.limiter.clone();
    let carts = state.carts.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.prune().await;
            let evicted = carts.evict_idle(CART_IDLE_TTL);
            if evicted > 0 {
                debug!(evicted, remaining = carts.len(), "Evicted idle carts");
            }
        }
    });

    let app = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
