//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (first tick immediate)
//!     → Probe every backend concurrently (GET <address>/health)
//!     → Wait for all probes of the pass
//!     → Store weight 1 (healthy) or 0 (unhealthy) on each backend
//! ```
//!
//! # Design Decisions
//! - Fixed-rate schedule; the next pass does not wait an extra interval
//! - A probe failure only touches its own backend
//! - No retries within a pass; the next pass is the retry

pub mod active;

pub use active::{HealthMonitor, ProbeError};
