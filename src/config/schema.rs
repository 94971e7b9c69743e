//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mock server.
//! All types derive Serde traits for deserialization from config files, and every
//! field has a default so an empty file yields the stock server.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the mock server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Sliding-window rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Access log configuration.
    pub access_log: AccessLogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum accepted requests per client within the window.
    pub max_requests: u32,

    /// Length of the trailing window in seconds.
    pub window_secs: u64,

    /// Header to take the client key from when present (e.g. "x-forwarded-for").
    /// Falls back to the remote IP address.
    pub key_header: Option<String>,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 200,
            window_secs: 30,
            key_header: None,
        }
    }
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Emit one line per completed request on stdout.
    pub enabled: bool,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
