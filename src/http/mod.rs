//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → load balancer picks a backend (503 if none)
//!     → request.rs (URI rewrite, forwarding headers)
//!     → upstream client
//!     → response.rs (relay response, or 502 on failure)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::DispatchError;
pub use server::HttpServer;
