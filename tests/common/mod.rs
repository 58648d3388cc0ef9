//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use weighted_proxy::config::{BackendConfig, ProxyConfig};
use weighted_proxy::{BackendRegistry, HttpServer, Shutdown};

/// Bind an ephemeral local port.
pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

pub fn backend_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}

/// Start a raw TCP backend that answers every request with 200 and a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Read the request head before answering.
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend whose `/health` answer is produced by `health` and whose
/// other routes answer 200 with `name`.
pub async fn start_programmable_backend<F, Fut>(name: &'static str, health: F) -> SocketAddr
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = StatusCode> + Send + 'static,
{
    let (listener, addr) = bind_local().await;
    let app = Router::new()
        .route("/health", get(move || health()))
        .fallback(move || async move { name });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that echoes the request it received as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    let app = Router::new().fallback(|request: Request| async move {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        (
            StatusCode::CREATED,
            [("x-backend", "echo")],
            Json(json!({
                "method": parts.method.as_str(),
                "uri": parts.uri.to_string(),
                "body": String::from_utf8_lossy(&body),
                "host": header("host"),
                "x_forwarded_for": header("x-forwarded-for"),
                "x_custom": header("x-custom"),
                "connection": header("connection"),
            })),
        )
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that waits `delay` before answering every request.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let (listener, addr) = bind_local().await;
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        Body::from("slow")
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Proxy config over `backends` with health checks and the admin listener off.
pub fn proxy_config(backends: &[(SocketAddr, u32)]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backends = backends
        .iter()
        .map(|(addr, weight)| BackendConfig::new(backend_url(*addr), *weight))
        .collect();
    config.health_check.enabled = false;
    config.admin.enabled = false;
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Arc<BackendRegistry>, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let registry = server.registry();
    let (listener, addr) = bind_local().await;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, registry, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
