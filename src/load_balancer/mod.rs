//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: BackendConfig[] → pool.rs (BackendRegistry, fixed order)
//!
//! Per request:
//!     pool.rs select()
//!     → weighted.rs (advance cursor, skip zero-weight backends)
//!     → backend.rs (chosen descriptor)
//!     → Return backend or NoHealthyBackend
//! ```
//!
//! # Design Decisions
//! - Registry order is scheduling order and never changes
//! - Live weights are atomics written by the health monitor
//! - The cursor is the only state guarded by a lock
//! - Selection always terminates, even with every backend at weight 0

use std::sync::Arc;
use thiserror::Error;

pub mod backend;
pub mod pool;
pub mod weighted;

pub use backend::Backend;
pub use pool::BackendRegistry;
pub use weighted::WeightedRoundRobin;

/// Selection failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadBalancerError {
    #[error("no healthy backend available")]
    NoHealthyBackend,
}

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next backend from the ordered set.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Result<Arc<Backend>, LoadBalancerError>;
}
