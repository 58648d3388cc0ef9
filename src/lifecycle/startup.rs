//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and build the backend registry
//! - Start background tasks (health checks, metrics, admin listener)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The proxy listener starts last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin;
use crate::config::{ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Fatal startup failure.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    let admin_config = config.admin.clone();
    let observability = config.observability.clone();
    let bind_address = config.listener.bind_address.clone();

    let server = HttpServer::new(config)?;

    tracing::info!(
        bind_address = %bind_address,
        backends = server.registry().len(),
        health_checks = server.config().health_check.enabled,
        "Configuration loaded"
    );
    for backend in server.registry().all_backends() {
        tracing::info!(
            address = %backend.address(),
            weight = backend.configured_weight(),
            "Backend registered"
        );
    }

    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    if admin_config.enabled {
        let admin_listener = bind(&admin_config.bind_address).await?;
        let registry = server.registry();
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(admin_listener, registry, admin_shutdown).await {
                tracing::error!(error = %e, "Admin listener failed");
            }
        });
    }

    let listener = bind(&bind_address).await?;
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server.run(listener, server_shutdown).await?;
    Ok(())
}
