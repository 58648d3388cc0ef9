//! Interleaved weighted round-robin strategy.
//!
//! The cursor remembers the last visited index and the weight level of the
//! current lap. Each call advances the index; every wrap to index 0 lowers the
//! lap weight by one (capped at the highest live weight), and when it reaches
//! zero it restarts from the highest live weight. A backend is handed out
//! when its live weight is positive and at least the lap weight, so heavier
//! backends win more turns per cycle and the turns cluster towards the front
//! of the registry.

use std::sync::{Arc, Mutex};

use crate::load_balancer::{backend::Backend, LoadBalancer, LoadBalancerError};

/// Scheduler position carried between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerCursor {
    /// Index of the backend returned (or last visited) by the previous call.
    pub index: usize,
    /// Weight level of the current lap.
    pub cycle_weight: i64,
}

/// Weighted round-robin selector.
///
/// The whole selection runs under one mutex so concurrent callers each
/// advance the cursor from a consistent position.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    cursor: Mutex<SchedulerCursor>,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn cursor(&self) -> SchedulerCursor {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Result<Arc<Backend>, LoadBalancerError> {
        let len = backends.len();
        if len == 0 {
            return Err(LoadBalancerError::NoHealthyBackend);
        }

        // The cursor is never left half-updated, so a poisoned lock is still usable.
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        if cursor.index >= len {
            cursor.index = 0;
        }

        // Consecutive zero-weight visits; one full sweep of them means nothing is live.
        let mut dead_run = 0;
        loop {
            cursor.index = (cursor.index + 1) % len;

            if cursor.index == 0 {
                let max_live = backends
                    .iter()
                    .map(|b| i64::from(b.current_weight()))
                    .max()
                    .unwrap_or(0);
                // Never wait out a lap level above every live weight.
                cursor.cycle_weight = (cursor.cycle_weight - 1).min(max_live);
                if cursor.cycle_weight <= 0 {
                    cursor.cycle_weight = max_live;
                }
            }

            let backend = &backends[cursor.index];
            let weight = i64::from(backend.current_weight());

            if weight == 0 {
                dead_run += 1;
                if dead_run >= len {
                    return Err(LoadBalancerError::NoHealthyBackend);
                }
                continue;
            }
            dead_run = 0;

            if weight >= cursor.cycle_weight {
                return Ok(backend.clone());
            }
        }
    }
}
