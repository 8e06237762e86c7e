//! HTTP host for proxyload dist directories.
//!
//! Serves artifacts, release bootstraps and documents over HTTP so browsers
//! and server-side hosts can load releases built by the CLI.
//!
//! # Architecture
//!
//! - **Routes**: static dist serving, health check and release listing
//! - **Watcher**: debounced source tree monitoring for rebuild-on-change

pub mod error;
pub mod routes;
pub mod watcher;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use proxyload_core::DistLayout;

pub use error::{ServerError, ServerResult};
pub use routes::{AppState, create_router};
pub use watcher::{DEFAULT_DEBOUNCE, SourceWatcher};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Dist directory to serve.
    pub dist_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            dist_dir: PathBuf::from("dist"),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ServerError::Address(format!("{}:{}", self.host, self.port)))
    }
}

/// Router for the configured dist directory.
pub fn router(config: &ServerConfig) -> axum::Router {
    let state = Arc::new(AppState {
        layout: DistLayout::new(&config.dist_dir),
    });
    create_router(state)
}

/// Serve the dist directory until Ctrl+C.
pub async fn serve(config: ServerConfig) -> ServerResult<()> {
    if !config.dist_dir.is_dir() {
        return Err(ServerError::Io {
            path: config.dist_dir.clone(),
            message: "dist directory does not exist; run a build first".to_string(),
        });
    }

    let addr = config.addr()?;
    let app = router(&config);

    tracing::info!(
        "Serving {} at http://{}",
        config.dist_dir.display(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Handle Ctrl+C for graceful shutdown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
