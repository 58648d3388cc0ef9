//! Backend registry.
//!
//! # Responsibilities
//! - Build the fixed, ordered backend set from configuration
//! - Apply the load balancing algorithm to select backends
//! - Expose the backends to the health monitor and admin surface

use std::sync::Arc;
use url::Url;

use crate::config::{BackendConfig, ConfigError};
use crate::load_balancer::{
    backend::Backend, weighted::WeightedRoundRobin, LoadBalancer, LoadBalancerError,
};

/// The fixed set of backends plus the scheduler that walks it.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendRegistry {
    /// Create a registry from configuration, scheduled by weighted round robin.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, ConfigError> {
        Self::with_balancer(configs, Box::new(WeightedRoundRobin::new()))
    }

    /// Create a registry with an explicit selection strategy.
    pub fn with_balancer(
        configs: &[BackendConfig],
        balancer: Box<dyn LoadBalancer>,
    ) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::InvalidBackend {
                address: String::new(),
                reason: "backend list is empty".to_string(),
            });
        }

        let mut backends = Vec::with_capacity(configs.len());
        for config in configs {
            let url = Url::parse(&config.address).map_err(|e| ConfigError::InvalidBackend {
                address: config.address.clone(),
                reason: e.to_string(),
            })?;
            backends.push(Arc::new(Backend::new(url, config.weight)));
        }

        Ok(Self { backends, balancer })
    }

    /// Select the next backend.
    pub fn select(&self) -> Result<Arc<Backend>, LoadBalancerError> {
        let result = self.balancer.next_server(&self.backends);
        if result.is_err() {
            tracing::debug!(backend_count = self.backends.len(), "No healthy backends found");
            for b in &self.backends {
                tracing::debug!(
                    address = %b.address(),
                    weight = b.current_weight(),
                    "Backend status"
                );
            }
        }
        result
    }

    /// All backends, in scheduling order.
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
