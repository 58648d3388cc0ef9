use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::load_balancer::BackendRegistry;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backends: usize,
    pub healthy_backends: usize,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub configured_weight: u32,
    pub current_weight: u32,
    pub healthy: bool,
}

/// Result of a selection query.
#[derive(Debug, Serialize)]
pub struct ServerSelection {
    pub server: String,
}

pub async fn get_status(State(registry): State<Arc<BackendRegistry>>) -> Json<SystemStatus> {
    let healthy_backends = registry
        .all_backends()
        .iter()
        .filter(|b| b.is_eligible())
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if healthy_backends > 0 { "operational" } else { "degraded" },
        backends: registry.len(),
        healthy_backends,
    })
}

pub async fn get_backends(
    State(registry): State<Arc<BackendRegistry>>,
) -> Json<Vec<BackendStatus>> {
    let statuses = registry
        .all_backends()
        .iter()
        .map(|b| BackendStatus {
            address: b.address().to_string(),
            configured_weight: b.configured_weight(),
            current_weight: b.current_weight(),
            healthy: b.is_eligible(),
        })
        .collect();

    Json(statuses)
}

/// Ask the scheduler for its next pick without forwarding anything.
///
/// This runs the same selection as client traffic, so it advances the cursor.
pub async fn get_server(
    State(registry): State<Arc<BackendRegistry>>,
) -> Result<Json<ServerSelection>, (StatusCode, Json<Value>)> {
    match registry.select() {
        Ok(backend) => Ok(Json(ServerSelection {
            server: backend.address().to_string(),
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}
