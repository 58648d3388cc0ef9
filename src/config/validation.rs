//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend addresses and weights
//! - Validate value ranges (intervals and timeouts > 0, bind addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend {index}: invalid address {address:?}: {reason}")]
    InvalidAddress {
        index: usize,
        address: String,
        reason: String,
    },

    #[error("backend {index}: unsupported scheme {scheme:?} (only http is supported)")]
    UnsupportedScheme { index: usize, scheme: String },

    #[error("backend {index}: weight must be positive")]
    ZeroWeight { index: usize },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field}: invalid socket address {value:?}")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("health_check.path must start with '/', got {0:?}")]
    InvalidHealthPath(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for (index, backend) in config.backends.iter().enumerate() {
        match Url::parse(&backend.address) {
            Ok(url) => {
                if url.scheme() != "http" {
                    errors.push(ValidationError::UnsupportedScheme {
                        index,
                        scheme: url.scheme().to_string(),
                    });
                }
                if url.host_str().is_none() {
                    errors.push(ValidationError::InvalidAddress {
                        index,
                        address: backend.address.clone(),
                        reason: "missing host".to_string(),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::InvalidAddress {
                index,
                address: backend.address.clone(),
                reason: e.to_string(),
            }),
        }

        if backend.weight == 0 {
            errors.push(ValidationError::ZeroWeight { index });
        }
    }

    let durations = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(
            config.health_check.path.clone(),
        ));
    }

    check_bind(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_bind(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_bind(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}
