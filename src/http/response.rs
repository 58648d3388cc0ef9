//! Response handling and dispatch errors.
//!
//! # Responsibilities
//! - Relay the backend response to the client
//! - Strip hop-by-hop headers on the way back
//! - Map dispatch failures to HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the body
//! - Nothing eligible → 503; refused, reset or timed-out backend → 502
//! - A failed dispatch is never retried against another backend

use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use thiserror::Error;

use crate::http::request::strip_hop_by_hop;
use crate::load_balancer::LoadBalancerError;

/// Failure while dispatching a client request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no healthy backend available")]
    NoHealthyBackend,

    #[error("backend {backend} unreachable: {source}")]
    BackendUnreachable {
        backend: String,
        source: hyper_util::client::legacy::Error,
    },

    #[error("backend {backend} did not respond within {timeout:?}")]
    UpstreamTimeout { backend: String, timeout: Duration },

    #[error("failed to build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NoHealthyBackend => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::BackendUnreachable { .. }
            | DispatchError::UpstreamTimeout { .. }
            | DispatchError::InvalidRequest(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<LoadBalancerError> for DispatchError {
    fn from(err: LoadBalancerError) -> Self {
        match err {
            LoadBalancerError::NoHealthyBackend => DispatchError::NoHealthyBackend,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let body = match self.status_code() {
            StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
            _ => "Bad Gateway",
        };
        (self.status_code(), body).into_response()
    }
}

/// Convert a backend response into the response streamed to the client.
pub fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
