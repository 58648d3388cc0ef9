use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use std::net::SocketAddr;

/// Minimal backend for trying the load balancer locally.
#[derive(Parser)]
#[command(name = "mock-backend")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 5001)]
    port: u16,

    /// Answer health checks with 503 instead of 200.
    #[arg(long)]
    unhealthy: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let port = args.port;
    let health_status = if args.unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let app = Router::new()
        .route("/", get(move || async move { format!("This is from {}", port) }))
        .route("/health", get(move || async move { health_status }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Mock backend listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
