//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::security::TokenKeys;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Start the gateway in front of `resources` and block until shutdown.
pub async fn run(config: GatewayConfig, resources: Router) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .map_err(|_| StartupError::BindAddress(config.listener.bind_address.clone()))?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(metrics_addr) => metrics::init_metrics(metrics_addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let keys = Arc::new(TokenKeys::from_config(&config.auth));
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config, keys, resources);

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    match tls {
        Some(tls) => server.run_tls(addr, &tls, shutdown.subscribe()).await?,
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|source| StartupError::Bind { addr, source })?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    // Stop background tasks even when the server exited on its own.
    shutdown.trigger();
    Ok(())
}
