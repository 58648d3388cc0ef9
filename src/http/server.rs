//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener, one task per connection
//! - Ask the scheduler for a backend and forward the request
//! - Start the health monitor alongside the listener

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{validation::validate_config, ConfigError, ProxyConfig};
use crate::health::HealthMonitor;
use crate::http::request::{prepare_upstream_request, request_id, UuidRequestId};
use crate::http::response::{relay, DispatchError};
use crate::load_balancer::{Backend, BackendRegistry};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub client: Client<HttpConnector, Body>,
    pub request_timeout: Duration,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    registry: Arc<BackendRegistry>,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the configuration cannot be served.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let registry = Arc::new(BackendRegistry::from_config(&config.backends)?);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            registry: registry.clone(),
            client,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Shared handle to the backend registry.
    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.len(),
            "Load balancer starting"
        );

        if self.config.health_check.enabled {
            let monitor =
                HealthMonitor::new(self.registry.clone(), self.config.health_check.clone());
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Selects a backend and forwards the request to it.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let backend = match state.registry.select() {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "No healthy backends"
            );
            metrics::record_no_healthy_backend();
            let response = DispatchError::from(e).into_response();
            metrics::record_request(&method, response.status().as_u16(), "none", start_time);
            return response;
        }
    };

    tracing::info!(
        request_id = %request_id,
        target = %backend.address(),
        method = %method,
        path = %path,
        "Routing request"
    );

    let response = match forward(&state, &backend, peer, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                target = %backend.address(),
                error = %e,
                "Failed to route request"
            );
            e.into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), backend.address(), start_time);
    response
}

/// Send the request to `backend` and relay its response.
async fn forward(
    state: &AppState,
    backend: &Backend,
    peer: SocketAddr,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    let upstream = prepare_upstream_request(request, backend, peer)?;

    match tokio::time::timeout(state.request_timeout, state.client.request(upstream)).await {
        Ok(Ok(response)) => Ok(relay(response)),
        Ok(Err(source)) => Err(DispatchError::BackendUnreachable {
            backend: backend.address().to_string(),
            source,
        }),
        Err(_) => Err(DispatchError::UpstreamTimeout {
            backend: backend.address().to_string(),
            timeout: state.request_timeout,
        }),
    }
}
