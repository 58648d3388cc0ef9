//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Update backend weights based on results
//!
//! A passing probe sets the live weight to exactly 1 and a failing probe sets
//! it to 0. Recovery does not restore the configured weight, so a backend that
//! has failed once is scheduled as weight 1 from then on.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, BackendRegistry};
use crate::observability::metrics;

/// Weight assigned to a backend whose probe passed.
pub const HEALTHY_WEIGHT: u32 = 1;
/// Weight assigned to a backend whose probe failed.
pub const UNHEALTHY_WEIGHT: u32 = 0;

/// Why a single probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe URI {uri:?}")]
    InvalidUri { uri: String },

    #[error("non-success status {0}")]
    Status(StatusCode),

    #[error("connection error: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub struct HealthMonitor {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    /// Probe on a fixed interval until shutdown. The first pass runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one pass: probe every backend concurrently and wait for all of them.
    pub async fn check_all(&self) {
        let probes = self
            .registry
            .all_backends()
            .iter()
            .map(|backend| self.check_one(backend));

        join_all(probes).await;
    }

    async fn check_one(&self, backend: &Arc<Backend>) {
        let weight = match self.probe(backend).await {
            Ok(()) => {
                tracing::debug!(address = %backend.address(), "Backend is healthy");
                HEALTHY_WEIGHT
            }
            Err(e) => {
                tracing::warn!(address = %backend.address(), error = %e, "Health check failed");
                UNHEALTHY_WEIGHT
            }
        };

        let previous = backend.set_current_weight(weight);
        if (previous == 0) != (weight == 0) {
            tracing::info!(
                address = %backend.address(),
                previous_weight = previous,
                weight,
                "Backend health changed"
            );
        }

        metrics::record_backend_weight(backend.address(), weight);
    }

    /// Issue a single GET against the backend's health path.
    pub async fn probe(&self, backend: &Backend) -> Result<(), ProbeError> {
        let uri_string = format!("{}{}", backend.address(), self.config.path);
        let uri: Uri = uri_string
            .parse()
            .map_err(|_| ProbeError::InvalidUri { uri: uri_string.clone() })?;

        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "weighted-proxy-health-check")
            .body(Body::empty())
            .map_err(|_| ProbeError::InvalidUri { uri: uri_string })?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(ProbeError::Status(response.status())),
            Ok(Err(e)) => Err(ProbeError::Connect(e)),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}
