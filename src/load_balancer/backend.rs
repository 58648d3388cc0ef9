//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Hold the static configured weight and the live scheduling weight
//!
//! The live weight is a single atomic word. The health monitor is its only
//! writer and the scheduler reads it without holding any backend-level lock,
//! so a selection may observe an update slightly late.

use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Parsed base URL of the backend.
    url: Url,
    /// Display form of the address, without a trailing slash.
    address: String,
    /// Weight from configuration; never changes.
    configured_weight: u32,
    /// Weight observed by the scheduler; 0 means ineligible.
    current_weight: AtomicU32,
}

impl Backend {
    /// Create a new backend. The live weight starts at the configured weight.
    pub fn new(url: Url, configured_weight: u32) -> Self {
        let address = url.as_str().trim_end_matches('/').to_string();
        Self {
            url,
            address,
            configured_weight,
            current_weight: AtomicU32::new(configured_weight),
        }
    }

    /// Base URL of the backend.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Address as configured, e.g. `http://localhost:5001`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// `host[:port]` for building upstream URIs.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Path component of the base URL, without a trailing slash.
    pub fn base_path(&self) -> &str {
        self.url.path().trim_end_matches('/')
    }

    pub fn configured_weight(&self) -> u32 {
        self.configured_weight
    }

    pub fn current_weight(&self) -> u32 {
        self.current_weight.load(Ordering::Relaxed)
    }

    /// Store a new live weight, returning the previous one.
    pub fn set_current_weight(&self, weight: u32) -> u32 {
        self.current_weight.swap(weight, Ordering::Relaxed)
    }

    /// True when the scheduler may hand this backend out.
    pub fn is_eligible(&self) -> bool {
        self.current_weight() > 0
    }
}
