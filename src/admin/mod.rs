//! Administrative surface.
//!
//! Served on its own listener so its routes never shadow proxied paths.
//! Unauthenticated; bind it to a private address.

pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::load_balancer::BackendRegistry;

pub fn setup_admin_router(registry: Arc<BackendRegistry>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/backends", get(get_backends))
        .route("/server", get(get_server))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin router until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<BackendRegistry>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin listener starting");

    axum::serve(listener, setup_admin_router(registry))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn registry(weights: &[u32]) -> Arc<BackendRegistry> {
        let configs: Vec<BackendConfig> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| BackendConfig::new(format!("http://127.0.0.1:{}", 5001 + i), *w))
            .collect();
        Arc::new(BackendRegistry::from_config(&configs).unwrap())
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn server_route_follows_scheduler() {
        let registry = registry(&[3, 2, 1]);
        let router = setup_admin_router(registry);

        let mut picks = Vec::new();
        for _ in 0..3 {
            let (status, body) = get_json(router.clone(), "/server").await;
            assert_eq!(status, StatusCode::OK);
            picks.push(body["server"].as_str().unwrap().to_string());
        }
        assert_eq!(
            picks,
            vec!["http://127.0.0.1:5002", "http://127.0.0.1:5003", "http://127.0.0.1:5001"]
        );
    }

    #[tokio::test]
    async fn server_route_reports_unavailable() {
        let registry = registry(&[1, 1]);
        for b in registry.all_backends() {
            b.set_current_weight(0);
        }

        let (status, body) = get_json(setup_admin_router(registry), "/server").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "no healthy backend available");
    }

    #[tokio::test]
    async fn backends_route_lists_weights() {
        let registry = registry(&[3, 1]);
        registry.all_backends()[1].set_current_weight(0);

        let (status, body) = get_json(setup_admin_router(registry), "/backends").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["configured_weight"], 3);
        assert_eq!(body[0]["current_weight"], 3);
        assert_eq!(body[1]["healthy"], false);
    }
}
