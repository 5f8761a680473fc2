//! HTTP server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::utils::shutdown_signal;

/// Bind `0.0.0.0:PORT` and serve until SIGINT or SIGTERM.
///
/// A termination signal ends the server at once; open connections are
/// dropped, not drained.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let app = create_router(AppState::new(config.clone()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server running on port {}", config.port);
    info!("Environment: {}", config.environment().unwrap_or("development"));
    info!("API base: {}", config.api_base_url);
    if config.is_production() {
        info!("Serving static bundle from {}", config.static_dir.display());
    }

    let server = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    );

    tokio::select! {
        result = server => result?,
        signal = shutdown_signal() => {
            info!("Received {}, shutting down", signal);
        }
    }

    Ok(())
}
