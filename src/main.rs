//! Weighted round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                LOAD BALANCER                 │
//!                         │                                              │
//!     Client Request      │  ┌──────────┐    ┌────────────────────────┐  │
//!     ────────────────────┼─▶│   http   │───▶│ load_balancer          │  │
//!                         │  │  server  │    │ weighted round robin   │  │
//!                         │  └────┬─────┘    └───────────┬────────────┘  │
//!                         │       │                      │ reads weights │
//!     Client Response     │       ▼                      ▼               │
//!     ◀───────────────────┼── forward ──────────▶ BackendRegistry ◀──────┼── health
//!                         │       │                                      │   monitor
//!                         └───────┼──────────────────────────────────────┘
//!                                 ▼
//!                              Backend
//! ```

use std::path::PathBuf;

use clap::Parser;
use weighted_proxy::config::{load_config, ProxyConfig};
use weighted_proxy::lifecycle::startup;
use weighted_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "weighted-proxy")]
#[command(about = "Weighted round-robin HTTP load balancer", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the proxy listener address (e.g. 0.0.0.0:8000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                logging::init("info");
                tracing::error!(path = %path.display(), error = %e, "Failed to load configuration");
                return Err(e.into());
            }
        },
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("weighted-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Load balancer failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
